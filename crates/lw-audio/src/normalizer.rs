use crate::goertzel::NUM_BINS;

/// Suiveur de max par bin : sort la *forme* spectrale, pas l'énergie.
///
/// Chaque bin entretient un maximum suivi avec montée et descente
/// indépendantes et un plancher ; la sortie est `scale · bin / max`.
/// Une fois le suiveur posé, le bin dominant tend vers ~1.0 quelle que
/// soit la loudness — les effets qui veulent l'énergie brute lisent
/// `bins64`, pas la variante adaptative.
///
/// # Example
/// ```
/// use lw_audio::normalizer::AdaptiveNormalizer;
/// let mut norm = AdaptiveNormalizer::new(0.35, 0.02, 0.015, 0.95);
/// let mut bins = [0.0f32; 64];
/// bins[10] = 0.5;
/// let mut out = [0.0f32; 64];
/// for _ in 0..200 { norm.process(&bins, &mut out); }
/// assert!(out[10] > 0.8);
/// ```
pub struct AdaptiveNormalizer {
    followers: [f32; NUM_BINS],
    rise: f32,
    fall: f32,
    floor: f32,
    scale: f32,
}

impl AdaptiveNormalizer {
    /// Build with explicit rates. All four are runtime tunables.
    #[must_use]
    pub fn new(rise: f32, fall: f32, floor: f32, scale: f32) -> Self {
        Self {
            followers: [floor.max(1e-6); NUM_BINS],
            rise,
            fall,
            floor: floor.max(1e-6),
            scale,
        }
    }

    /// Update the follower rates without resetting the follower state.
    pub fn set_params(&mut self, rise: f32, fall: f32, floor: f32, scale: f32) {
        self.rise = rise;
        self.fall = fall;
        self.floor = floor.max(1e-6);
        self.scale = scale;
    }

    /// One hop: advance every follower and write the shaped spectrum.
    /// Output may exceed 1.0 when the follower sits at its floor.
    pub fn process(&mut self, bins: &[f32; NUM_BINS], out: &mut [f32; NUM_BINS]) {
        for i in 0..NUM_BINS {
            let x = bins[i];
            let m = &mut self.followers[i];
            let rate = if x > *m { self.rise } else { self.fall };
            *m += (x - *m) * rate;
            *m = m.max(self.floor);
            out[i] = self.scale * x / *m;
        }
    }

    /// Current follower level for one bin (diagnostics).
    #[must_use]
    pub fn follower(&self, i: usize) -> f32 {
        self.followers.get(i).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_preserved_across_loudness() {
        let mut norm = AdaptiveNormalizer::new(0.35, 0.02, 0.015, 0.95);
        let mut out = [0.0f32; NUM_BINS];

        let mut bins = [0.0f32; NUM_BINS];
        bins[20] = 0.1;
        for _ in 0..300 {
            norm.process(&bins, &mut out);
        }
        let settled_quiet = out[20];

        // 5x louder: the follower re-settles, the shape output returns.
        bins[20] = 0.5;
        for _ in 0..300 {
            norm.process(&bins, &mut out);
        }
        let settled_loud = out[20];

        let drift = (settled_loud - settled_quiet).abs() / settled_quiet.max(1e-6);
        assert!(drift < 0.2, "adaptive output drifted {drift}");
    }

    #[test]
    fn floor_allows_output_above_one() {
        let mut norm = AdaptiveNormalizer::new(0.35, 0.02, 0.5, 1.0);
        let mut bins = [0.0f32; NUM_BINS];
        bins[0] = 0.9;
        let mut out = [0.0f32; NUM_BINS];
        // First hop: follower still near the (high) floor but below input.
        norm.process(&bins, &mut out);
        assert!(out[0] > 1.0);
    }

    #[test]
    fn silent_bins_output_zero() {
        let mut norm = AdaptiveNormalizer::new(0.35, 0.02, 0.015, 0.95);
        let bins = [0.0f32; NUM_BINS];
        let mut out = [1.0f32; NUM_BINS];
        norm.process(&bins, &mut out);
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
