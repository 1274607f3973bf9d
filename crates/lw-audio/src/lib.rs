/// Analyse audio temps réel : banc de Goertzel, normalisation adaptative,
/// détection onset/tempo/accord, et l'orchestrateur de pipeline qui publie
/// le snapshot de features consommé par le renderer.
///
/// Pas de FFT : 64 bins demi-ton via la récurrence de Goertzel, cadencés
/// par hop (analyse légère) et par balayage lourd (un hop sur N).

pub mod chord;
pub mod error;
pub mod goertzel;
pub mod normalizer;
pub mod onset;
pub mod pipeline;
pub mod smoothing;
pub mod source;
pub mod tempo;

#[cfg(feature = "capture")]
pub mod capture;

pub use error::AudioError;
pub use goertzel::{GoertzelBank, LightBands, NUM_BANDS, NUM_BINS, NUM_CHROMA};
pub use normalizer::AdaptiveNormalizer;
pub use pipeline::{AudioCommand, AudioConfig, AudioParams, AudioParamsUpdate, AudioPipeline};
pub use source::{SampleSource, SilenceSource, ToneSource};
