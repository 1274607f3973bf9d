/// Métadonnées de pattern : famille, tags et drapeaux consultés par le
/// scheduler (politique de reset, opt-out de correction). Exprimés en
/// données, jamais en héritage.

/// Broad effect family, for UI grouping and API listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectFamily {
    /// Slow, texture-first fields.
    Ambient,
    /// Driven by the 64-bin spectrum.
    Spectral,
    /// Driven by beats, onsets and percussion.
    Rhythmic,
    /// Driven by chroma and chord detection.
    Harmonic,
    /// Plain utility output (solid colours, meters).
    Utility,
}

impl EffectFamily {
    /// Lowercase name as exposed over the API.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EffectFamily::Ambient => "ambient",
            EffectFamily::Spectral => "spectral",
            EffectFamily::Rhythmic => "rhythmic",
            EffectFamily::Harmonic => "harmonic",
            EffectFamily::Utility => "utility",
        }
    }
}

/// Tag bits for effect capabilities.
pub mod tags {
    /// Reacts to the audio snapshot at all.
    pub const AUDIO_REACTIVE: u32 = 1 << 0;
    /// Motion emanates from the centre pair.
    pub const CENTRE_ORIGIN: u32 = 1 << 1;
    /// Uses the tempo tracker.
    pub const TEMPO_SYNCED: u32 = 1 << 2;
    /// Uses the chord detector.
    pub const HARMONIC: u32 = 1 << 3;
    /// Low-brightness ambient lighting candidate.
    pub const AMBIENT_SAFE: u32 = 1 << 4;
}

/// Static metadata carried by every effect and mirrored into the
/// registry's id-indexed table at registration time.
#[derive(Clone, Copy, Debug)]
pub struct EffectMeta {
    /// Effect name, stable, lowercase, dash-separated.
    pub name: &'static str,
    /// Family bucket.
    pub family: EffectFamily,
    /// Tag bitset (see [`tags`]).
    pub tags: u32,
    /// Writes mirrored pixels from the centre pair outward.
    pub centre_origin: bool,
    /// Next frame depends on this frame's buffer (feedback) — the
    /// scheduler preserves the buffer instead of clearing it.
    pub stateful: bool,
    /// Amplitude ratios carry meaning; colour correction defaults off.
    pub lgp_sensitive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_are_lowercase() {
        for f in [
            EffectFamily::Ambient,
            EffectFamily::Spectral,
            EffectFamily::Rhythmic,
            EffectFamily::Harmonic,
            EffectFamily::Utility,
        ] {
            assert_eq!(f.name(), f.name().to_lowercase());
        }
    }
}
