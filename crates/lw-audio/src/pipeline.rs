use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use lw_core::snapshot::{AudioSnapshot, SnapshotWriter};
use serde::{Deserialize, Serialize};

use crate::chord::ChordDetector;
use crate::goertzel::{GoertzelBank, LightBands, NUM_BINS};
use crate::normalizer::AdaptiveNormalizer;
use crate::onset::OnsetDetector;
use crate::smoothing::HeavySmoother;
use crate::source::SampleSource;
use crate::tempo::TempoTracker;

/// Cadence et dimensionnement du pipeline, figés au boot.
#[derive(Clone, Copy, Debug)]
pub struct AudioConfig {
    /// Analysis sample rate.
    pub sample_rate: u32,
    /// Heavy-analysis window in samples.
    pub window_size: usize,
    /// Hop length in samples.
    pub hop_size: usize,
    /// One heavy sweep every N hops.
    pub heavy_every: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 12_800,
            window_size: 1500,
            hop_size: 128,
            heavy_every: 10,
        }
    }
}

/// Paramètres runtime du pipeline, reconfigurables à chaud.
///
/// Exposés tels quels sur l'API audio ; chaque champ est aussi un tunable
/// persistant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AudioParams {
    /// Adaptive follower rise rate.
    pub adaptive_rise: f32,
    /// Adaptive follower fall rate.
    pub adaptive_fall: f32,
    /// Adaptive follower floor.
    pub adaptive_floor: f32,
    /// Adaptive output scale.
    pub adaptive_scale: f32,
    /// RMS level that wakes the presence machine.
    pub presence_enter: f32,
    /// RMS level under which presence decays.
    pub presence_exit: f32,
    /// Chord accumulation EMA weight per heavy update.
    pub chord_alpha: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            adaptive_rise: 0.35,
            adaptive_fall: 0.02,
            adaptive_floor: 0.015,
            adaptive_scale: 0.95,
            presence_enter: 0.015,
            presence_exit: 0.008,
            chord_alpha: 0.3,
        }
    }
}

/// Mise à jour partielle des paramètres : seuls les champs présents changent.
///
/// Le contrat REST accepte l'objet imbriqué `pipeline` ou les champs à plat ;
/// les deux débouchent ici.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct AudioParamsUpdate {
    /// New rise rate, if present.
    pub adaptive_rise: Option<f32>,
    /// New fall rate, if present.
    pub adaptive_fall: Option<f32>,
    /// New floor, if present.
    pub adaptive_floor: Option<f32>,
    /// New scale, if present.
    pub adaptive_scale: Option<f32>,
    /// New presence-enter threshold, if present.
    pub presence_enter: Option<f32>,
    /// New presence-exit threshold, if present.
    pub presence_exit: Option<f32>,
    /// New chord EMA weight, if present.
    pub chord_alpha: Option<f32>,
}

impl AudioParamsUpdate {
    /// Apply the present fields over `params`.
    pub fn apply(&self, params: &mut AudioParams) {
        if let Some(v) = self.adaptive_rise {
            params.adaptive_rise = v;
        }
        if let Some(v) = self.adaptive_fall {
            params.adaptive_fall = v;
        }
        if let Some(v) = self.adaptive_floor {
            params.adaptive_floor = v;
        }
        if let Some(v) = self.adaptive_scale {
            params.adaptive_scale = v;
        }
        if let Some(v) = self.presence_enter {
            params.presence_enter = v;
        }
        if let Some(v) = self.presence_exit {
            params.presence_exit = v;
        }
        if let Some(v) = self.chord_alpha {
            params.chord_alpha = v;
        }
    }
}

/// Commandes acceptées par la tâche audio en cours de route.
pub enum AudioCommand {
    /// Reconfigure the runtime parameters.
    SetParams(AudioParamsUpdate),
}

/// États de présence audio, à hystérésis sur le RMS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Presence {
    Silent,
    Listening,
    Tracking,
}

/// L'orchestrateur : possède la source, les détecteurs et le writer du
/// snapshot. Un hop = une publication, sans exception — même affamé, le
/// pipeline publie un snapshot (novelty nulle) pour garder la cadence.
pub struct AudioPipeline {
    cfg: AudioConfig,
    params: AudioParams,
    source: Box<dyn SampleSource>,
    goertzel: GoertzelBank,
    light: LightBands,
    normalizer: AdaptiveNormalizer,
    onset: OnsetDetector,
    tempo: TempoTracker,
    chord: ChordDetector,
    smoother: HeavySmoother,
    writer: SnapshotWriter,
    commands: flume::Receiver<AudioCommand>,
    shutdown: Arc<AtomicBool>,

    window: Vec<f32>,
    hop_buf: Vec<f32>,
    adaptive: [f32; NUM_BINS],
    snapshot: AudioSnapshot,
    presence: Presence,
    presence_hops: u32,
    starved_hops: u32,
    starvation_logged: bool,
}

impl AudioPipeline {
    /// Assemble the pipeline. All buffers are allocated here; the hop
    /// loop itself never allocates.
    #[must_use]
    pub fn new(
        cfg: AudioConfig,
        params: AudioParams,
        source: Box<dyn SampleSource>,
        writer: SnapshotWriter,
        commands: flume::Receiver<AudioCommand>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let mut cfg = cfg;
        // A hop longer than the window would break the slide below.
        cfg.window_size = cfg.window_size.max(1);
        cfg.hop_size = cfg.hop_size.clamp(1, cfg.window_size);
        let hop_rate = cfg.sample_rate as f32 / cfg.hop_size as f32;
        Self {
            goertzel: GoertzelBank::new(cfg.sample_rate, cfg.window_size),
            light: LightBands::new(cfg.sample_rate, cfg.hop_size),
            normalizer: AdaptiveNormalizer::new(
                params.adaptive_rise,
                params.adaptive_fall,
                params.adaptive_floor,
                params.adaptive_scale,
            ),
            onset: OnsetDetector::new(hop_rate),
            tempo: TempoTracker::new(hop_rate),
            chord: ChordDetector::new(params.chord_alpha),
            smoother: HeavySmoother::new(),
            window: vec![0.0; cfg.window_size],
            hop_buf: vec![0.0; cfg.hop_size],
            adaptive: [0.0; NUM_BINS],
            snapshot: AudioSnapshot::default(),
            presence: Presence::Silent,
            presence_hops: 0,
            starved_hops: 0,
            starvation_logged: false,
            cfg,
            params,
            source,
            writer,
            commands,
            shutdown,
        }
    }

    /// Spawn the hop loop on its own thread.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("lw-audio".to_string())
            .spawn(move || self.run())
    }

    /// The hop loop. Exits after completing the current hop once the
    /// shutdown flag is raised — never mid-publish.
    pub fn run(mut self) {
        log::info!(
            "audio pipeline up: {} Hz, window {}, hop {} ({} Hz), heavy 1/{}",
            self.cfg.sample_rate,
            self.cfg.window_size,
            self.cfg.hop_size,
            self.cfg.sample_rate as f32 / self.cfg.hop_size as f32,
            self.cfg.heavy_every,
        );
        while !self.shutdown.load(Ordering::Relaxed) {
            self.drain_commands();
            self.hop();
        }
        log::info!("audio pipeline down at hop {}", self.snapshot.monotonic_hop_index);
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                AudioCommand::SetParams(update) => {
                    update.apply(&mut self.params);
                    self.normalizer.set_params(
                        self.params.adaptive_rise,
                        self.params.adaptive_fall,
                        self.params.adaptive_floor,
                        self.params.adaptive_scale,
                    );
                    self.chord = ChordDetector::new(self.params.chord_alpha);
                    log::info!("audio params reconfigured");
                }
            }
        }
    }

    /// One hop: read, analyse, publish.
    pub fn hop(&mut self) {
        let hop_len = self.hop_buf.len();
        let got = {
            let buf = &mut self.hop_buf[..];
            self.source.read(buf)
        };

        self.snapshot.monotonic_hop_index += 1;

        if got < hop_len {
            // Starved hop: publish a quiet snapshot, keep the cadence.
            self.starved_hops += 1;
            self.snapshot.novelty = 0.0;
            self.snapshot.spectral_flux = 0.0;
            self.snapshot.beat_tick = false;
            self.snapshot.downbeat_tick = false;
            self.snapshot.snare_trigger = false;
            self.snapshot.hihat_trigger = false;
            let hop_rate = self.cfg.sample_rate as f32 / hop_len as f32;
            if !self.starvation_logged && self.starved_hops as f32 > hop_rate {
                log::warn!("audio source starved for over a second");
                self.starvation_logged = true;
                self.enter_silent();
            }
            self.writer.publish(self.snapshot);
            return;
        }
        if self.starved_hops > 0 {
            self.starved_hops = 0;
            self.starvation_logged = false;
        }

        // Slide the analysis window and append the hop.
        self.window.copy_within(hop_len.., 0);
        let tail = self.window.len() - hop_len;
        self.window[tail..].copy_from_slice(&self.hop_buf);

        // === Light per-hop work ===
        let mut sum_sq = 0.0f32;
        let mut peak = 0.0f32;
        for &s in &self.hop_buf {
            sum_sq += s * s;
            peak = peak.max(s.abs());
        }
        let inst_rms = (sum_sq / hop_len as f32).sqrt().min(1.0);
        let (rms, fast_rms) = self.smoother.smooth_rms(inst_rms);
        self.snapshot.rms = rms;
        self.snapshot.fast_rms = fast_rms;
        self.snapshot.peak = peak.min(1.0);

        self.light.analyze(&self.hop_buf);
        let onset = self.onset.process(self.light.bands());
        self.snapshot.spectral_flux = onset.flux;
        self.snapshot.novelty = onset.novelty;
        self.snapshot.snare_energy = onset.snare_energy;
        self.snapshot.hihat_energy = onset.hihat_energy;
        self.snapshot.snare_trigger = onset.snare_trigger;
        self.snapshot.hihat_trigger = onset.hihat_trigger;

        self.update_presence(rms);

        // Adaptive shaping of the last heavy spectrum, every hop.
        self.normalizer.process(self.goertzel.bins(), &mut self.adaptive);
        self.snapshot.bins64_adaptive = self.adaptive;

        let tempo = if self.presence == Presence::Tracking {
            self.tempo.on_hop(onset.novelty)
        } else {
            self.tempo.on_hop(0.0)
        };
        self.snapshot.bpm = tempo.bpm;
        self.snapshot.tempo_confidence = tempo.confidence;
        self.snapshot.beat_phase = tempo.phase;
        self.snapshot.beat_tick = tempo.beat_tick;
        self.snapshot.downbeat_tick = tempo.downbeat_tick;

        // === Heavy work on its own cadence ===
        if self.snapshot.monotonic_hop_index % u64::from(self.cfg.heavy_every.max(1)) == 0 {
            self.goertzel.analyze(&self.window);
            self.snapshot.bins64 = *self.goertzel.bins();
            self.snapshot.bands8 = *self.goertzel.bands();
            self.snapshot.chroma = *self.goertzel.chroma();

            self.smoother
                .smooth_heavy(self.goertzel.bands(), self.goertzel.chroma());
            self.snapshot.heavy_bands8 = *self.smoother.heavy_bands();
            self.snapshot.heavy_chroma = *self.smoother.heavy_chroma();

            if self.presence == Presence::Tracking {
                self.tempo.update_tempo();
                let chord = self.chord.update(self.goertzel.chroma());
                self.snapshot.chord_root = chord.root;
                self.snapshot.chord_type = chord.kind;
                self.snapshot.chord_confidence = chord.confidence;
            }
        }

        self.writer.publish(self.snapshot);
    }

    fn update_presence(&mut self, rms: f32) {
        let hop_rate = self.cfg.sample_rate as f32 / self.cfg.hop_size.max(1) as f32;
        match self.presence {
            Presence::Silent => {
                if rms > self.params.presence_enter {
                    self.presence = Presence::Listening;
                    self.presence_hops = 0;
                    log::debug!("presence: silent -> listening");
                }
            }
            Presence::Listening => {
                if rms < self.params.presence_exit {
                    self.presence = Presence::Silent;
                } else {
                    self.presence_hops += 1;
                    // Half a second of sustained presence unlocks tracking.
                    if self.presence_hops as f32 > hop_rate * 0.5 {
                        self.presence = Presence::Tracking;
                        log::debug!("presence: listening -> tracking");
                    }
                }
            }
            Presence::Tracking => {
                if rms < self.params.presence_exit {
                    self.presence_hops += 1;
                    // A second and a half of quiet drops back to silent.
                    if self.presence_hops as f32 > hop_rate * 1.5 {
                        self.enter_silent();
                    }
                } else {
                    self.presence_hops = 0;
                }
            }
        }
    }

    fn enter_silent(&mut self) {
        if self.presence != Presence::Silent {
            log::debug!("presence: -> silent");
        }
        self.presence = Presence::Silent;
        self.presence_hops = 0;
        self.tempo.reset();
        self.chord.reset();
        self.snapshot.bpm = 0.0;
        self.snapshot.tempo_confidence = 0.0;
        self.snapshot.chord_confidence = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SilenceSource, ToneSource};
    use lw_core::snapshot::SnapshotBuffer;

    fn pipeline_with(source: Box<dyn SampleSource>) -> (AudioPipeline, lw_core::snapshot::SnapshotReader) {
        let (writer, reader) = SnapshotBuffer::split();
        let (_tx, rx) = flume::bounded(4);
        let pipeline = AudioPipeline::new(
            AudioConfig::default(),
            AudioParams::default(),
            source,
            writer,
            rx,
            Arc::new(AtomicBool::new(false)),
        );
        (pipeline, reader)
    }

    #[test]
    fn silence_publishes_quiet_snapshots() {
        let (mut p, mut reader) = pipeline_with(Box::new(SilenceSource::new(12_800, false)));
        for _ in 0..30 {
            p.hop();
        }
        let s = reader.read();
        assert_eq!(s.monotonic_hop_index, 30);
        assert_eq!(s.chord_confidence, 0.0);
        assert!(!s.beat_tick);
        assert!(s.rms < 0.001);
    }

    #[test]
    fn tone_fills_the_expected_bin() {
        use crate::goertzel::{bin_frequency, nearest_bin};
        let target = nearest_bin(1000.0);
        let tone = ToneSource::new(bin_frequency(target), 0.5, 12_800);
        let (mut p, mut reader) = pipeline_with(Box::new(tone));
        for _ in 0..50 {
            p.hop();
        }
        let s = reader.read();
        let loudest = s
            .bins64
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(loudest, target);
    }

    #[test]
    fn adaptive_holds_steady_across_amplitude_steps() {
        use crate::goertzel::{bin_frequency, nearest_bin};
        let target = nearest_bin(1000.0);
        let (writer, mut reader) = SnapshotBuffer::split();
        let (_tx, rx) = flume::bounded(4);
        let mut p = AudioPipeline::new(
            AudioConfig::default(),
            AudioParams::default(),
            Box::new(ToneSource::new(bin_frequency(target), 0.1, 12_800)),
            writer,
            rx,
            Arc::new(AtomicBool::new(false)),
        );

        // Settle at the low amplitude (well past 500 ms at 100 Hz hops).
        for _ in 0..200 {
            p.hop();
        }
        let quiet = reader.read();
        let quiet_raw = quiet.bins64[target];
        let quiet_adaptive = quiet.bins64_adaptive[target];

        // Step the amplitude up 5x and settle again.
        p.source = Box::new(ToneSource::new(bin_frequency(target), 0.5, 12_800));
        for _ in 0..200 {
            p.hop();
        }
        let loud = reader.read();
        let loud_raw = loud.bins64[target];
        let loud_adaptive = loud.bins64_adaptive[target];

        let raw_ratio = loud_raw / quiet_raw.max(1e-6);
        assert!((3.5..6.5).contains(&raw_ratio), "raw ratio {raw_ratio}");

        let drift = (loud_adaptive - quiet_adaptive).abs() / quiet_adaptive.max(1e-6);
        assert!(drift < 0.2, "adaptive drifted {drift}");
    }

    #[test]
    fn starved_source_keeps_cadence_with_zero_novelty() {
        struct Starved;
        impl SampleSource for Starved {
            fn read(&mut self, _out: &mut [f32]) -> usize {
                0
            }
            fn sample_rate(&self) -> u32 {
                12_800
            }
        }
        let (mut p, mut reader) = pipeline_with(Box::new(Starved));
        for _ in 0..10 {
            p.hop();
        }
        let s = reader.read();
        assert_eq!(s.monotonic_hop_index, 10);
        assert_eq!(s.novelty, 0.0);
        assert!(!s.beat_tick);
    }

    #[test]
    fn shutdown_exits_after_current_hop() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (writer, _reader) = SnapshotBuffer::split();
        let (_tx, rx) = flume::bounded(4);
        let p = AudioPipeline::new(
            AudioConfig::default(),
            AudioParams::default(),
            Box::new(SilenceSource::new(12_800, false)),
            writer,
            rx,
            Arc::clone(&shutdown),
        );
        let handle = p.spawn().unwrap();
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }
}
