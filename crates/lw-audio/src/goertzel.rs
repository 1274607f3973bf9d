/// Banc de Goertzel : 64 bins demi-ton A1..C7, agrégation mel 8 bandes,
/// repli chroma 12 classes. O(N) par bin, zéro allocation en hot path.

/// Number of semitone-spaced analysis bins (A1 .. C7).
pub const NUM_BINS: usize = 64;
/// Number of mel-weighted aggregate bands.
pub const NUM_BANDS: usize = 8;
/// Number of pitch classes in the chroma fold.
pub const NUM_CHROMA: usize = 12;

/// Lowest analysed pitch: A1.
const BASE_FREQ: f32 = 55.0;
/// Pitch class of A relative to C.
const BASE_PITCH_CLASS: usize = 9;

/// Centre frequency of semitone bin `i`.
///
/// # Example
/// ```
/// use lw_audio::goertzel::bin_frequency;
/// assert!((bin_frequency(0) - 55.0).abs() < 0.01);
/// assert!((bin_frequency(12) - 110.0).abs() < 0.01);
/// ```
#[must_use]
pub fn bin_frequency(i: usize) -> f32 {
    BASE_FREQ * (i as f32 / 12.0).exp2()
}

/// Index du bin le plus proche d'une fréquence donnée.
#[must_use]
pub fn nearest_bin(freq: f32) -> usize {
    if freq <= BASE_FREQ {
        return 0;
    }
    let i = (12.0 * (freq / BASE_FREQ).log2()).round() as usize;
    i.min(NUM_BINS - 1)
}

/// Magnitude Goertzel d'une fréquence unique sur un bloc (non fenêtré).
///
/// `coeff = 2·cos(2π·f/fs)` précalculé par l'appelant.
#[inline]
fn goertzel_magnitude(samples: &[f32], coeff: f32) -> f32 {
    let mut s1 = 0.0f32;
    let mut s2 = 0.0f32;
    for &x in samples {
        let s0 = x + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    (s1 * s1 + s2 * s2 - coeff * s1 * s2).max(0.0).sqrt()
}

/// Le banc lourd : 64 bins sur la fenêtre complète (1500 échantillons
/// nominal), mis à jour à la cadence lourde. Le dernier résultat reste
/// valide entre deux balayages.
pub struct GoertzelBank {
    window_size: usize,
    coeffs: [f32; NUM_BINS],
    /// Hann window, precomputed.
    hann: Vec<f32>,
    /// Windowed-sample scratch, reused every sweep.
    scratch: Vec<f32>,
    /// Mel weights: for each band, a per-bin weight row.
    band_weights: [[f32; NUM_BINS]; NUM_BANDS],
    /// Per-pitch-class bin counts for the chroma fold.
    chroma_counts: [f32; NUM_CHROMA],
    bins: [f32; NUM_BINS],
    bands: [f32; NUM_BANDS],
    chroma: [f32; NUM_CHROMA],
}

impl GoertzelBank {
    /// Build the bank for a sample rate and window size. All tables are
    /// computed here; `analyze` never allocates.
    #[must_use]
    pub fn new(sample_rate: u32, window_size: usize) -> Self {
        let sr = sample_rate as f32;
        let mut coeffs = [0.0f32; NUM_BINS];
        for (i, c) in coeffs.iter_mut().enumerate() {
            *c = 2.0 * (std::f32::consts::TAU * bin_frequency(i) / sr).cos();
        }

        let hann: Vec<f32> = (0..window_size)
            .map(|n| {
                let x = std::f32::consts::TAU * n as f32 / window_size.max(1) as f32;
                0.5 * (1.0 - x.cos())
            })
            .collect();

        // Triangular mel filters over the analysed range.
        let mel = |f: f32| 2595.0 * (1.0 + f / 700.0).log10();
        let mel_lo = mel(bin_frequency(0));
        let mel_hi = mel(bin_frequency(NUM_BINS - 1));
        let mut band_weights = [[0.0f32; NUM_BINS]; NUM_BANDS];
        for (b, row) in band_weights.iter_mut().enumerate() {
            let centre = mel_lo + (mel_hi - mel_lo) * (b as f32 + 1.0) / (NUM_BANDS as f32 + 1.0);
            let half = (mel_hi - mel_lo) / (NUM_BANDS as f32 + 1.0);
            let mut norm = 0.0f32;
            for (i, w) in row.iter_mut().enumerate() {
                let d = (mel(bin_frequency(i)) - centre).abs();
                *w = (1.0 - d / half).max(0.0);
                norm += *w;
            }
            if norm > 0.0 {
                for w in row.iter_mut() {
                    *w /= norm;
                }
            }
        }

        let mut chroma_counts = [0.0f32; NUM_CHROMA];
        for i in 0..NUM_BINS {
            chroma_counts[(BASE_PITCH_CLASS + i) % NUM_CHROMA] += 1.0;
        }

        Self {
            window_size,
            coeffs,
            hann,
            scratch: vec![0.0; window_size],
            band_weights,
            chroma_counts,
            bins: [0.0; NUM_BINS],
            bands: [0.0; NUM_BANDS],
            chroma: [0.0; NUM_CHROMA],
        }
    }

    /// Full sweep over one analysis window. A window shorter than the
    /// configured size yields all-zero outputs — never a fault.
    pub fn analyze(&mut self, window: &[f32]) {
        if window.len() < self.window_size {
            self.bins = [0.0; NUM_BINS];
            self.bands = [0.0; NUM_BANDS];
            self.chroma = [0.0; NUM_CHROMA];
            return;
        }
        let window = &window[window.len() - self.window_size..];

        for (dst, (&x, &w)) in self.scratch.iter_mut().zip(window.iter().zip(&self.hann)) {
            *dst = x * w;
        }

        // Hann coherent gain is 0.5: scale by 4/N for unit-amplitude ≈ 1.0.
        let norm = 4.0 / self.window_size as f32;
        for i in 0..NUM_BINS {
            self.bins[i] = (goertzel_magnitude(&self.scratch, self.coeffs[i]) * norm).min(1.0);
        }

        for (b, row) in self.band_weights.iter().enumerate() {
            let mut acc = 0.0f32;
            for (w, &x) in row.iter().zip(&self.bins) {
                acc += w * x;
            }
            self.bands[b] = acc.min(1.0);
        }

        self.chroma = [0.0; NUM_CHROMA];
        for (i, &x) in self.bins.iter().enumerate() {
            self.chroma[(BASE_PITCH_CLASS + i) % NUM_CHROMA] += x;
        }
        for (c, &n) in self.chroma.iter_mut().zip(&self.chroma_counts) {
            if n > 0.0 {
                *c = (*c / n).min(1.0);
            }
        }
    }

    /// Last completed semitone spectrum.
    #[inline]
    #[must_use]
    pub fn bins(&self) -> &[f32; NUM_BINS] {
        &self.bins
    }

    /// Last completed mel band energies.
    #[inline]
    #[must_use]
    pub fn bands(&self) -> &[f32; NUM_BANDS] {
        &self.bands
    }

    /// Last completed chroma fold.
    #[inline]
    #[must_use]
    pub fn chroma(&self) -> &[f32; NUM_CHROMA] {
        &self.chroma
    }
}

/// Banc léger per-hop : les 8 fréquences centrales de bande seulement,
/// sur la fenêtre du hop. Alimente le flux spectral et les percussions
/// sans attendre le balayage lourd.
pub struct LightBands {
    coeffs: [f32; NUM_BANDS],
    bands: [f32; NUM_BANDS],
    norm_len: f32,
}

impl LightBands {
    /// Band-centre Goertzel probes for per-hop work.
    #[must_use]
    pub fn new(sample_rate: u32, hop_size: usize) -> Self {
        let sr = sample_rate as f32;
        let mel = |f: f32| 2595.0 * (1.0 + f / 700.0).log10();
        let mel_inv = |m: f32| 700.0 * (10.0f32.powf(m / 2595.0) - 1.0);
        let mel_lo = mel(bin_frequency(0));
        let mel_hi = mel(bin_frequency(NUM_BINS - 1));
        let mut coeffs = [0.0f32; NUM_BANDS];
        for (b, c) in coeffs.iter_mut().enumerate() {
            let centre =
                mel_inv(mel_lo + (mel_hi - mel_lo) * (b as f32 + 1.0) / (NUM_BANDS as f32 + 1.0));
            *c = 2.0 * (std::f32::consts::TAU * centre / sr).cos();
        }
        Self {
            coeffs,
            bands: [0.0; NUM_BANDS],
            norm_len: hop_size.max(1) as f32,
        }
    }

    /// Analyse one hop of samples.
    pub fn analyze(&mut self, hop: &[f32]) {
        if hop.is_empty() {
            self.bands = [0.0; NUM_BANDS];
            return;
        }
        let norm = 2.0 / self.norm_len;
        for (b, c) in self.coeffs.iter().enumerate() {
            self.bands[b] = (goertzel_magnitude(hop, *c) * norm).min(1.0);
        }
    }

    /// Per-hop band magnitudes.
    #[inline]
    #[must_use]
    pub fn bands(&self) -> &[f32; NUM_BANDS] {
        &self.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, amplitude: f32, n: usize, sr: f32) -> Vec<f32> {
        (0..n)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / sr).sin() * amplitude)
            .collect()
    }

    #[test]
    fn pure_tone_lands_in_its_bin() {
        let sr = 12_800u32;
        let mut bank = GoertzelBank::new(sr, 1500);
        let target = nearest_bin(440.0);
        let samples = tone(bin_frequency(target), 0.8, 1500, sr as f32);
        bank.analyze(&samples);

        let bins = bank.bins();
        let loudest = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(loudest, target);
        assert!(bins[target] > 0.4, "bin magnitude {}", bins[target]);
    }

    #[test]
    fn neighbour_leakage_is_bounded() {
        let sr = 12_800u32;
        let mut bank = GoertzelBank::new(sr, 1500);
        let target = nearest_bin(1000.0);
        let samples = tone(bin_frequency(target), 0.8, 1500, sr as f32);
        bank.analyze(&samples);
        let bins = bank.bins();
        // Two semitones away the response must have dropped well below the peak.
        assert!(bins[target + 2] < bins[target] * 0.5);
        assert!(bins[target - 2] < bins[target] * 0.5);
    }

    #[test]
    fn magnitude_scales_with_amplitude() {
        let sr = 12_800u32;
        let mut bank = GoertzelBank::new(sr, 1500);
        let target = nearest_bin(1000.0);
        let quiet = tone(bin_frequency(target), 0.1, 1500, sr as f32);
        let loud = tone(bin_frequency(target), 0.5, 1500, sr as f32);

        bank.analyze(&quiet);
        let q = bank.bins()[target];
        bank.analyze(&loud);
        let l = bank.bins()[target];
        let ratio = l / q.max(1e-6);
        assert!((4.0..6.0).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn short_window_yields_zeros() {
        let mut bank = GoertzelBank::new(12_800, 1500);
        bank.analyze(&[0.5; 100]);
        assert!(bank.bins().iter().all(|&b| b == 0.0));
        assert!(bank.bands().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn chroma_fold_hits_the_right_pitch_class() {
        let sr = 12_800u32;
        let mut bank = GoertzelBank::new(sr, 1500);
        // Bin 0 is A1: pitch class 9 (A).
        let samples = tone(bin_frequency(0), 0.8, 1500, sr as f32);
        bank.analyze(&samples);
        let chroma = bank.chroma();
        let top = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(top, 9);
    }
}
