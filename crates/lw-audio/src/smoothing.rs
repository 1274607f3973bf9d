use crate::goertzel::{NUM_BANDS, NUM_CHROMA};

/// Lissage exponentiel asymétrique : attaque rapide, relâchement lent.
///
/// # Example
/// ```
/// use lw_audio::smoothing::Ar;
/// let ar = Ar::new(0.6, 0.1);
/// let v = ar.step(1.0, 0.0);
/// assert!((v - 0.6).abs() < 1e-6);
/// ```
#[derive(Clone, Copy)]
pub struct Ar {
    attack: f32,
    release: f32,
}

impl Ar {
    /// Coefficients in (0, 1]: weight of the new value on rise / fall.
    #[must_use]
    pub fn new(attack: f32, release: f32) -> Self {
        Self {
            attack: attack.clamp(0.01, 1.0),
            release: release.clamp(0.01, 1.0),
        }
    }

    /// One smoothing step from `previous` towards `current`.
    #[inline]
    #[must_use]
    pub fn step(&self, current: f32, previous: f32) -> f32 {
        let alpha = if current > previous {
            self.attack
        } else {
            self.release
        };
        alpha * current + (1.0 - alpha) * previous
    }
}

/// Lisseur des variantes "heavy" : bandes et chroma à constante lente,
/// plus les RMS lissé/rapide. État fixe, zéro allocation.
pub struct HeavySmoother {
    band_ar: Ar,
    chroma_ar: Ar,
    rms_ar: Ar,
    fast_rms_ar: Ar,
    heavy_bands: [f32; NUM_BANDS],
    heavy_chroma: [f32; NUM_CHROMA],
    rms: f32,
    fast_rms: f32,
}

impl HeavySmoother {
    /// Defaults tuned for the ~100 Hz hop cadence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            band_ar: Ar::new(0.15, 0.04),
            chroma_ar: Ar::new(0.15, 0.04),
            rms_ar: Ar::new(0.25, 0.05),
            fast_rms_ar: Ar::new(0.8, 0.4),
            heavy_bands: [0.0; NUM_BANDS],
            heavy_chroma: [0.0; NUM_CHROMA],
            rms: 0.0,
            fast_rms: 0.0,
        }
    }

    /// Advance band/chroma slow variants with the latest heavy results.
    pub fn smooth_heavy(&mut self, bands: &[f32; NUM_BANDS], chroma: &[f32; NUM_CHROMA]) {
        for (h, &b) in self.heavy_bands.iter_mut().zip(bands) {
            *h = self.band_ar.step(b, *h);
        }
        for (h, &c) in self.heavy_chroma.iter_mut().zip(chroma) {
            *h = self.chroma_ar.step(c, *h);
        }
    }

    /// Advance the two RMS envelopes with the hop's instantaneous RMS.
    pub fn smooth_rms(&mut self, instantaneous: f32) -> (f32, f32) {
        self.rms = self.rms_ar.step(instantaneous, self.rms);
        self.fast_rms = self.fast_rms_ar.step(instantaneous, self.fast_rms);
        (self.rms, self.fast_rms)
    }

    /// Slow-smoothed bands.
    #[must_use]
    pub fn heavy_bands(&self) -> &[f32; NUM_BANDS] {
        &self.heavy_bands
    }

    /// Slow-smoothed chroma.
    #[must_use]
    pub fn heavy_chroma(&self) -> &[f32; NUM_CHROMA] {
        &self.heavy_chroma
    }
}

impl Default for HeavySmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_is_faster_than_release() {
        let ar = Ar::new(0.8, 0.1);
        let up = ar.step(1.0, 0.0);
        let down = 1.0 - ar.step(0.0, 1.0);
        assert!(up > down);
    }

    #[test]
    fn fast_rms_leads_slow_rms() {
        let mut s = HeavySmoother::new();
        let (rms, fast) = s.smooth_rms(1.0);
        assert!(fast > rms);
    }

    #[test]
    fn heavy_bands_trail_their_input() {
        let mut s = HeavySmoother::new();
        let bands = [1.0f32; NUM_BANDS];
        let chroma = [0.0f32; NUM_CHROMA];
        s.smooth_heavy(&bands, &chroma);
        assert!(s.heavy_bands()[0] < 1.0);
        assert!(s.heavy_bands()[0] > 0.0);
    }
}
