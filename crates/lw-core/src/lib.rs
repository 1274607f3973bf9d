/// Configuration, types, and shared structures for the LightwaveOS core.
///
/// This crate contains all shared types, traits, and configuration logic
/// used across the lightwave workspace: pixel and strip geometry, the
/// double-buffered frame pair, palettes, the published audio snapshot,
/// the durable tunable store, and the boot configuration.

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod palette;
pub mod pixel;
pub mod snapshot;
pub mod tunables;

pub use config::EngineConfig;
pub use error::CoreError;
pub use frame::{FramePair, FrameReader, FrameWriter, LedFrame};
pub use pixel::Rgb8;
pub use snapshot::{AudioSnapshot, ChordType, SnapshotBuffer, SnapshotReader, SnapshotWriter};
pub use tunables::{TunableStore, TunableValue};

/// Re-exports pour accès par chemin sémantique.
pub mod led {
    pub use crate::frame::{FramePair, LedFrame};
    pub use crate::geometry::{HALF_SPAN, LED_COUNT, LEDS_PER_STRIP, NUM_STRIPS};
    pub use crate::pixel::Rgb8;
}

/// Re-exports for audio types.
pub mod audio {
    pub use crate::snapshot::{AudioSnapshot, ChordType, SnapshotBuffer};
}
