/// Suivi de tempo par autocorrélation sur un historique de nouveauté.
///
/// L'historique couvre ~5 s à la cadence de hop ; le peigne est balayé à
/// la cadence lourde (le scan complet est trop cher pour chaque hop).
/// `beat_phase` est interpolée linéairement entre deux beats détectés ;
/// `beat_tick` est vraie pendant exactement un hop au passage du beat.

/// History length in hops (~5 s at the nominal 100 Hz hop rate).
const HISTORY_LEN: usize = 512;
/// Tracked tempo range.
const BPM_MIN: f32 = 60.0;
const BPM_MAX: f32 = 180.0;

/// Per-hop tempo frame.
#[derive(Clone, Copy, Default)]
pub struct TempoFrame {
    /// Estimated tempo (0.0 while unlocked).
    pub bpm: f32,
    /// Tracking confidence [0.0, 1.0].
    pub confidence: f32,
    /// Beat phase [0.0, 1.0).
    pub phase: f32,
    /// One-hop pulse at each beat boundary.
    pub beat_tick: bool,
    /// One-hop pulse every fourth beat.
    pub downbeat_tick: bool,
}

/// The tracker itself. All buffers are fixed-size.
pub struct TempoTracker {
    history: [f32; HISTORY_LEN],
    write_pos: usize,
    filled: usize,
    hop_rate: f32,
    bpm: f32,
    confidence: f32,
    phase: f32,
    beat_count: u32,
}

impl TempoTracker {
    /// Build for a hop rate in Hz.
    #[must_use]
    pub fn new(hop_rate: f32) -> Self {
        Self {
            history: [0.0; HISTORY_LEN],
            write_pos: 0,
            filled: 0,
            hop_rate,
            bpm: 0.0,
            confidence: 0.0,
            phase: 0.0,
            beat_count: 0,
        }
    }

    /// Per-hop update: record novelty, advance the phase.
    pub fn on_hop(&mut self, novelty: f32) -> TempoFrame {
        self.history[self.write_pos] = novelty;
        self.write_pos = (self.write_pos + 1) % HISTORY_LEN;
        self.filled = (self.filled + 1).min(HISTORY_LEN);

        let mut beat_tick = false;
        let mut downbeat_tick = false;
        if self.bpm > 0.0 {
            self.phase += self.bpm / (60.0 * self.hop_rate);
            if self.phase >= 1.0 {
                self.phase -= 1.0;
                beat_tick = true;
                self.beat_count = self.beat_count.wrapping_add(1);
                downbeat_tick = self.beat_count % 4 == 0;
            }
            // Strong novelty close to the predicted beat pulls the phase in.
            if novelty > 0.7 {
                if self.phase < 0.15 {
                    self.phase *= 0.5;
                } else if self.phase > 0.85 {
                    self.phase = 1.0 - (1.0 - self.phase) * 0.5;
                }
            }
        }

        TempoFrame {
            bpm: self.bpm,
            confidence: self.confidence,
            phase: self.phase,
            beat_tick,
            downbeat_tick,
        }
    }

    /// Heavy-cadence update: autocorrelation comb over the history.
    pub fn update_tempo(&mut self) {
        if self.filled < HISTORY_LEN / 2 {
            return;
        }

        let lag_min = ((60.0 / BPM_MAX) * self.hop_rate) as usize;
        let lag_max = (((60.0 / BPM_MIN) * self.hop_rate) as usize).min(self.filled / 2);
        if lag_min == 0 || lag_min >= lag_max {
            return;
        }

        let mut best_lag = 0usize;
        let mut best = 0.0f32;
        let mut second = 0.0f32;
        let span = self.filled - lag_max;
        for lag in lag_min..=lag_max {
            let mut acc = 0.0f32;
            for t in 0..span {
                acc += self.at(t) * self.at(t + lag);
            }
            // Slight short-lag bias so period multiples lose to the
            // fundamental instead of tying with it.
            let score = (acc / span as f32) * (1.0 - 0.1 * lag as f32 / lag_max as f32);
            if score > best {
                second = best;
                best = score;
                best_lag = lag;
            } else if score > second {
                second = score;
            }
        }

        if best <= 1e-6 || best_lag == 0 {
            // Flat history: decay confidence smoothly, keep the last bpm.
            self.confidence *= 0.9;
            if self.confidence < 0.05 {
                self.bpm = 0.0;
            }
            return;
        }

        let measured = 60.0 * self.hop_rate / best_lag as f32;
        self.bpm = if self.bpm > 0.0 {
            self.bpm * 0.7 + measured * 0.3
        } else {
            measured
        };
        self.confidence = ((best - second) / best).clamp(0.0, 1.0);
    }

    /// Forget everything (presence machine dropped to Silent).
    pub fn reset(&mut self) {
        self.history = [0.0; HISTORY_LEN];
        self.filled = 0;
        self.write_pos = 0;
        self.bpm = 0.0;
        self.confidence = 0.0;
        self.phase = 0.0;
        self.beat_count = 0;
    }

    /// History sample `t` hops back from the oldest retained entry.
    #[inline]
    fn at(&self, t: usize) -> f32 {
        let start = (self.write_pos + HISTORY_LEN - self.filled) % HISTORY_LEN;
        self.history[(start + t) % HISTORY_LEN]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clicks_at_120_bpm_converge() {
        let hop_rate = 100.0;
        let mut tracker = TempoTracker::new(hop_rate);
        // 120 BPM = one click every 50 hops.
        for hop in 0..600u32 {
            let novelty = if hop % 50 == 0 { 1.0 } else { 0.0 };
            tracker.on_hop(novelty);
            if hop % 10 == 0 {
                tracker.update_tempo();
            }
        }
        assert!(
            (tracker.bpm - 120.0).abs() < 3.0,
            "converged to {} bpm",
            tracker.bpm
        );
        assert!(tracker.confidence > 0.0);
    }

    #[test]
    fn beat_tick_fires_once_per_period() {
        let mut tracker = TempoTracker::new(100.0);
        tracker.bpm = 120.0;
        let mut ticks = 0;
        for _ in 0..100 {
            if tracker.on_hop(0.0).beat_tick {
                ticks += 1;
            }
        }
        // 1 s at 120 BPM: two beats.
        assert_eq!(ticks, 2);
    }

    #[test]
    fn silence_never_ticks() {
        let mut tracker = TempoTracker::new(100.0);
        for _ in 0..600 {
            let frame = tracker.on_hop(0.0);
            assert!(!frame.beat_tick);
            if tracker.filled % 10 == 0 {
                tracker.update_tempo();
            }
        }
        assert_eq!(tracker.bpm, 0.0);
    }
}
