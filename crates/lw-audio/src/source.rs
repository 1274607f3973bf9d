/// Interface "tire une fenêtre de PCM" et implémentations host-side.
///
/// Sur cible, l'implémentation est le driver I²S (hors périmètre). Côté
/// host on fournit une source silencieuse et un générateur de ton pour
/// les tests et la simulation.

/// Pulls mono f32 PCM at a fixed sample rate.
///
/// `read` blocks until `out.len()` samples are available and returns the
/// number actually written. A short read signals shutdown or starvation;
/// callers treat it as an empty hop, never as an error.
///
/// # Example
/// ```
/// use lw_audio::source::{SampleSource, ToneSource};
/// let mut src = ToneSource::new(1000.0, 0.5, 12_800);
/// let mut buf = [0.0f32; 64];
/// assert_eq!(src.read(&mut buf), 64);
/// ```
pub trait SampleSource: Send {
    /// Blocking read of `out.len()` samples. Returns the count written.
    fn read(&mut self, out: &mut [f32]) -> usize;

    /// Sample rate of the produced PCM.
    fn sample_rate(&self) -> u32;
}

/// Source muette : livre des zéros au rythme réel du sample rate.
///
/// Sert à simuler l'absence d'audio (micro débranché) sans fausser la
/// cadence de hop du pipeline.
pub struct SilenceSource {
    sample_rate: u32,
    realtime: bool,
}

impl SilenceSource {
    /// A silent source. `realtime` paces reads at the wall clock;
    /// tests pass `false` to run as fast as possible.
    #[must_use]
    pub fn new(sample_rate: u32, realtime: bool) -> Self {
        Self {
            sample_rate,
            realtime,
        }
    }
}

impl SampleSource for SilenceSource {
    fn read(&mut self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        if self.realtime {
            let secs = out.len() as f64 / f64::from(self.sample_rate);
            std::thread::sleep(std::time::Duration::from_secs_f64(secs));
        }
        out.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Générateur de sinus déterministe pour les tests d'analyse.
///
/// # Example
/// ```
/// use lw_audio::source::{SampleSource, ToneSource};
/// let mut src = ToneSource::new(440.0, 1.0, 12_800);
/// let mut buf = [0.0f32; 128];
/// src.read(&mut buf);
/// assert!(buf.iter().any(|s| s.abs() > 0.5));
/// ```
pub struct ToneSource {
    freq: f32,
    amplitude: f32,
    sample_rate: u32,
    phase: f32,
    realtime: bool,
}

impl ToneSource {
    /// A pure tone at `freq` Hz with the given amplitude.
    #[must_use]
    pub fn new(freq: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            freq,
            amplitude,
            sample_rate,
            phase: 0.0,
            realtime: false,
        }
    }

    /// Pace reads at the wall clock (for live simulation runs).
    #[must_use]
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    /// Change the amplitude mid-stream (amplitude-step tests).
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }
}

impl SampleSource for ToneSource {
    fn read(&mut self, out: &mut [f32]) -> usize {
        let step = std::f32::consts::TAU * self.freq / self.sample_rate as f32;
        for s in out.iter_mut() {
            *s = self.phase.sin() * self.amplitude;
            self.phase += step;
            if self.phase > std::f32::consts::TAU {
                self.phase -= std::f32::consts::TAU;
            }
        }
        if self.realtime {
            let secs = out.len() as f64 / f64::from(self.sample_rate);
            std::thread::sleep(std::time::Duration::from_secs_f64(secs));
        }
        out.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_delivers_zeroed_full_reads() {
        let mut src = SilenceSource::new(12_800, false);
        let mut buf = [1.0f32; 256];
        assert_eq!(src.read(&mut buf), 256);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tone_amplitude_is_respected() {
        let mut src = ToneSource::new(100.0, 0.25, 12_800);
        let mut buf = [0.0f32; 1024];
        src.read(&mut buf);
        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.2501 && peak > 0.2);
    }
}
