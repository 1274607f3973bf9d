use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

/// Vue partagée des stats de rendu, lisible sans lock depuis l'API.
#[derive(Default)]
pub struct SharedStats {
    /// Rolling fps × 1000.
    pub fps_milli: AtomicU32,
    /// Worst frame time over the window, µs.
    pub max_frame_us: AtomicU32,
    /// p95 frame time over the window, µs.
    pub p95_frame_us: AtomicU32,
    /// Frames that overran the period.
    pub frame_drops: AtomicU64,
    /// Total frames published.
    pub frames: AtomicU64,
    /// Hop index of the last consumed audio snapshot.
    pub audio_hop: AtomicU64,
}

impl SharedStats {
    /// Rolling fps.
    #[must_use]
    pub fn fps(&self) -> f64 {
        f64::from(self.fps_milli.load(Ordering::Relaxed)) / 1000.0
    }
}

/// Compteur FPS et temps de frame par fenêtre glissante. Zéro allocation
/// après init ; publie dans [`SharedStats`] à chaque tick.
///
/// # Example
/// ```
/// use lw_render::stats::RenderStats;
/// let mut stats = RenderStats::new(120);
/// stats.tick(2_000, false);
/// assert!(stats.shared().fps() >= 0.0);
/// ```
pub struct RenderStats {
    timestamps: VecDeque<Instant>,
    frame_times_us: VecDeque<u32>,
    window: usize,
    /// Scratch for the p95 sort, reused.
    sort_buf: Vec<u32>,
    shared: Arc<SharedStats>,
}

impl RenderStats {
    /// Window is the number of frames to average over (one second's
    /// worth at the target fps is the natural choice).
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(window + 1),
            frame_times_us: VecDeque::with_capacity(window + 1),
            window,
            sort_buf: Vec::with_capacity(window + 1),
            shared: Arc::new(SharedStats::default()),
        }
    }

    /// The shared handle for API readers.
    #[must_use]
    pub fn shared(&self) -> Arc<SharedStats> {
        Arc::clone(&self.shared)
    }

    /// Call once per frame, after publish. `frame_us` is the busy time
    /// of the frame; `overran` marks a period overrun.
    pub fn tick(&mut self, frame_us: u32, overran: bool) {
        let now = Instant::now();
        self.timestamps.push_back(now);
        if self.timestamps.len() > self.window {
            self.timestamps.pop_front();
        }
        self.frame_times_us.push_back(frame_us);
        if self.frame_times_us.len() > self.window {
            self.frame_times_us.pop_front();
        }

        if overran {
            self.shared.frame_drops.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.frames.fetch_add(1, Ordering::Relaxed);

        if self.timestamps.len() >= 2 {
            let first = self.timestamps.front().copied().unwrap_or(now);
            let secs = now.duration_since(first).as_secs_f64();
            if secs > 0.0 {
                let fps = (self.timestamps.len() - 1) as f64 / secs;
                self.shared
                    .fps_milli
                    .store((fps * 1000.0) as u32, Ordering::Relaxed);
            }
        }

        let max = self.frame_times_us.iter().copied().max().unwrap_or(0);
        self.shared.max_frame_us.store(max, Ordering::Relaxed);

        self.sort_buf.clear();
        self.sort_buf.extend(self.frame_times_us.iter().copied());
        self.sort_buf.sort_unstable();
        let p95_idx = (self.sort_buf.len().saturating_sub(1)) * 95 / 100;
        let p95 = self.sort_buf.get(p95_idx).copied().unwrap_or(0);
        self.shared.p95_frame_us.store(p95, Ordering::Relaxed);
    }

    /// Record which audio snapshot version fed the frame.
    pub fn set_audio_hop(&self, hop: u64) {
        self.shared.audio_hop.store(hop, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_are_counted() {
        let mut stats = RenderStats::new(10);
        stats.tick(1000, false);
        stats.tick(9000, true);
        stats.tick(1000, false);
        assert_eq!(stats.shared().frame_drops.load(Ordering::Relaxed), 1);
        assert_eq!(stats.shared().frames.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn max_and_p95_track_the_window() {
        let mut stats = RenderStats::new(100);
        for _ in 0..99 {
            stats.tick(1000, false);
        }
        stats.tick(50_000, false);
        let shared = stats.shared();
        assert_eq!(shared.max_frame_us.load(Ordering::Relaxed), 50_000);
        assert!(shared.p95_frame_us.load(Ordering::Relaxed) <= 50_000);
    }
}
