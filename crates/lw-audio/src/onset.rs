use crate::goertzel::NUM_BANDS;

/// Per-hop onset frame: flux, normalised novelty, percussion splits.
#[derive(Clone, Copy, Default)]
pub struct OnsetFrame {
    /// Half-wave-rectified spectral flux [0.0, 1.0].
    pub flux: f32,
    /// Flux normalised by a running follower [0.0, 1.0].
    pub novelty: f32,
    /// Mid-band percussion energy [0.0, 1.0].
    pub snare_energy: f32,
    /// Top-band percussion energy [0.0, 1.0].
    pub hihat_energy: f32,
    /// One-hop snare trigger.
    pub snare_trigger: bool,
    /// One-hop hihat trigger.
    pub hihat_trigger: bool,
}

/// Détection d'onset par flux spectral sur les bandes per-hop.
///
/// Seuil adaptatif (moyenne glissante du flux) et cooldown par trigger,
/// pour éviter l'effet mitraillette sur les roulements.
///
/// # Example
/// ```
/// use lw_audio::onset::OnsetDetector;
/// let detector = OnsetDetector::new(100.0);
/// ```
pub struct OnsetDetector {
    prev_bands: [f32; NUM_BANDS],
    primed: bool,
    /// Running average of flux for the adaptive threshold.
    flux_avg: f32,
    /// Max follower used to normalise novelty.
    flux_peak: f32,
    snare_env: f32,
    hihat_env: f32,
    hop_count: u64,
    last_snare_hop: u64,
    last_hihat_hop: u64,
    /// Minimum hops between triggers.
    cooldown: u64,
}

impl OnsetDetector {
    /// Build for a hop rate in Hz; the trigger cooldown is ~80 ms.
    #[must_use]
    pub fn new(hop_rate: f32) -> Self {
        Self {
            prev_bands: [0.0; NUM_BANDS],
            primed: false,
            flux_avg: 0.0,
            flux_peak: 1e-3,
            snare_env: 0.0,
            hihat_env: 0.0,
            hop_count: 0,
            last_snare_hop: 0,
            last_hihat_hop: 0,
            cooldown: ((hop_rate * 0.08) as u64).max(1),
        }
    }

    /// Process one hop of light band magnitudes.
    pub fn process(&mut self, bands: &[f32; NUM_BANDS]) -> OnsetFrame {
        self.hop_count += 1;

        // Half-wave-rectified flux, bass bands weighted double.
        let mut flux = 0.0f32;
        let mut snare_flux = 0.0f32;
        let mut hihat_flux = 0.0f32;
        if self.primed {
            for (i, (&cur, &prev)) in bands.iter().zip(self.prev_bands.iter()).enumerate() {
                let diff = (cur - prev).max(0.0);
                flux += if i < 2 { diff * 2.0 } else { diff };
                if (3..6).contains(&i) {
                    snare_flux += diff;
                }
                if i >= 6 {
                    hihat_flux += diff;
                }
            }
        }
        self.prev_bands = *bands;
        self.primed = true;
        let flux = (flux / NUM_BANDS as f32).min(1.0);

        // Novelty: flux against its own running peak.
        self.flux_peak = (self.flux_peak * 0.999).max(flux).max(1e-3);
        let novelty = (flux / self.flux_peak).clamp(0.0, 1.0);

        // Adaptive threshold over the running flux average.
        self.flux_avg = self.flux_avg * 0.93 + flux * 0.07;
        let threshold = self.flux_avg * 1.5 + 0.005;

        // Percussion envelopes: fast attack, exponential release.
        let snare_in = (snare_flux * 2.0).min(1.0);
        let hihat_in = (hihat_flux * 2.0).min(1.0);
        self.snare_env = if snare_in > self.snare_env {
            snare_in
        } else {
            self.snare_env * 0.85
        };
        self.hihat_env = if hihat_in > self.hihat_env {
            hihat_in
        } else {
            self.hihat_env * 0.80
        };

        let snare_trigger = snare_in > threshold
            && self.hop_count - self.last_snare_hop > self.cooldown;
        if snare_trigger {
            self.last_snare_hop = self.hop_count;
        }
        let hihat_trigger = hihat_in > threshold
            && self.hop_count - self.last_hihat_hop > self.cooldown;
        if hihat_trigger {
            self.last_hihat_hop = self.hop_count;
        }

        OnsetFrame {
            flux,
            novelty,
            snare_energy: self.snare_env,
            hihat_energy: self.hihat_env,
            snare_trigger,
            hihat_trigger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_spectrum_has_no_flux() {
        let mut d = OnsetDetector::new(100.0);
        let bands = [0.4f32; NUM_BANDS];
        d.process(&bands);
        let frame = d.process(&bands);
        assert_eq!(frame.flux, 0.0);
    }

    #[test]
    fn energy_jump_produces_novelty() {
        let mut d = OnsetDetector::new(100.0);
        let quiet = [0.02f32; NUM_BANDS];
        for _ in 0..20 {
            d.process(&quiet);
        }
        let loud = [0.6f32; NUM_BANDS];
        let frame = d.process(&loud);
        assert!(frame.flux > 0.0);
        assert!(frame.novelty > 0.5);
    }

    #[test]
    fn triggers_respect_cooldown() {
        let mut d = OnsetDetector::new(100.0);
        let quiet = [0.0f32; NUM_BANDS];
        let mut hit = [0.0f32; NUM_BANDS];
        hit[4] = 0.8;
        hit[7] = 0.8;

        for _ in 0..10 {
            d.process(&quiet);
        }
        let first = d.process(&hit);
        assert!(first.snare_trigger);
        // Immediate re-hit is inside the cooldown window.
        d.process(&quiet);
        let second = d.process(&hit);
        assert!(!second.snare_trigger);
    }
}
