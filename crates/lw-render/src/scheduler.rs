use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use lw_core::frame::{FrameWriter, LedFrame};
use lw_core::palette::PaletteStore;
use lw_core::snapshot::SnapshotReader;
use lw_core::tunables::TunableStore;
use lw_effects::context::EffectContext;
use lw_effects::registry::EffectRegistry;
use lw_plugin::PluginManager;

use crate::command::{Command, CommandBus, ShutdownFlag};
use crate::correction::{ColorCorrector, CorrectionParams};
use crate::stats::{RenderStats, SharedStats};
use crate::stream::LedStreamPublisher;
use crate::transition::{Curve, Transition};

/// Le registre partagé entre le renderer (dispatch + écriture de
/// paramètres) et l'API (lecture de descripteurs). Le lock n'est jamais
/// tenu à travers un point de suspension.
pub type SharedRegistry = Arc<Mutex<EffectRegistry>>;

/// Réglages de boot du scheduler.
#[derive(Clone, Copy, Debug)]
pub struct RendererConfig {
    /// Target frame rate.
    pub target_fps: u32,
    /// Effect selected at boot.
    pub boot_effect_id: u8,
    /// Palette selected at boot.
    pub boot_palette_id: u8,
    /// Initial global brightness.
    pub brightness: u8,
    /// Feature gate for the colour-correction engine.
    pub correction_enabled: bool,
    /// Feature gate for the LED stream publisher.
    pub stream_enabled: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            target_fps: 120,
            boot_effect_id: 0,
            boot_palette_id: 0,
            brightness: 255,
            correction_enabled: true,
            stream_enabled: true,
        }
    }
}

/// Le côté "précédent" d'une transition : un effet encore rendu chaque
/// frame, ou un instantané figé (retarget en cours de fondu).
enum PrevSource {
    Effect(u8),
    Frozen,
}

struct ActiveTransition {
    prev: PrevSource,
    fade: Transition,
}

/// Le scheduler de frames : boucle à période fixe, drainage des
/// commandes, un snapshot audio par frame, dispatch d'effet, fondu,
/// correction sur copie, publication, stats.
pub struct Renderer {
    cfg: RendererConfig,
    registry: SharedRegistry,
    plugins: Arc<PluginManager>,
    tunables: Arc<TunableStore>,
    palette: PaletteStore,
    snapshot: SnapshotReader,
    writer: FrameWriter,
    bus: CommandBus,
    shutdown: ShutdownFlag,
    stats: RenderStats,
    stream: LedStreamPublisher,
    corrector: ColorCorrector,
    /// Forward `ReloadPlugins` to housekeeping; `None` reloads inline.
    reload_tx: Option<flume::Sender<()>>,

    /// The effect state buffer. Stateful effects read their previous
    /// output here; colour correction never touches it.
    live: LedFrame,
    /// Previous-effect compositing buffer during a transition.
    scratch: LedFrame,
    /// Frozen blend captured when a transition is retargeted.
    frozen: LedFrame,

    current_id: u8,
    transition: Option<ActiveTransition>,
    brightness: u8,
    time: f32,
    cmd_buf: Vec<Command>,
}

impl Renderer {
    /// Assemble the scheduler. All frame buffers are created here.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        cfg: RendererConfig,
        registry: SharedRegistry,
        plugins: Arc<PluginManager>,
        tunables: Arc<TunableStore>,
        snapshot: SnapshotReader,
        writer: FrameWriter,
        bus: CommandBus,
        shutdown: ShutdownFlag,
        stream: LedStreamPublisher,
        reload_tx: Option<flume::Sender<()>>,
    ) -> Self {
        let mut palette = PaletteStore::default();
        palette.set_active(cfg.boot_palette_id);
        Self {
            registry,
            plugins,
            tunables,
            palette,
            snapshot,
            writer,
            bus,
            shutdown,
            stats: RenderStats::new(cfg.target_fps.max(1) as usize),
            stream,
            corrector: ColorCorrector::new(CorrectionParams::default()),
            reload_tx,
            live: LedFrame::default(),
            scratch: LedFrame::default(),
            frozen: LedFrame::default(),
            current_id: cfg.boot_effect_id,
            transition: None,
            brightness: cfg.brightness,
            time: 0.0,
            cmd_buf: Vec::with_capacity(32),
            cfg,
        }
    }

    /// Shared stats handle for the API.
    #[must_use]
    pub fn shared_stats(&self) -> Arc<SharedStats> {
        self.stats.shared()
    }

    /// Currently selected effect id.
    #[must_use]
    pub fn current_effect(&self) -> u8 {
        self.current_id
    }

    /// Spawn the render loop on its own thread.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("lw-render".to_string())
            .spawn(move || self.run())
    }

    /// The fixed-period loop. An overrun realigns the next deadline —
    /// the scheduler never runs two frames back-to-back to catch up.
    pub fn run(mut self) {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.cfg.target_fps.max(1)));
        log::info!(
            "renderer up: {} fps target ({:.3} ms period)",
            self.cfg.target_fps,
            period.as_secs_f64() * 1000.0
        );
        let mut last = Instant::now();
        let mut deadline = last + period;

        while !self.shutdown.is_requested() {
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32().clamp(0.000_5, 0.1);
            last = now;

            self.render_frame(dt);

            let frame_us = now.elapsed().as_micros().min(u128::from(u32::MAX)) as u32;
            let finished = Instant::now();
            let overran = finished > deadline;
            self.stats.tick(frame_us, overran);

            if overran {
                deadline = finished + period;
            } else {
                std::thread::sleep(deadline.duration_since(finished));
                deadline += period;
            }
        }
        let frames = self
            .stats
            .shared()
            .frames
            .load(std::sync::atomic::Ordering::Relaxed);
        log::info!("renderer down after {frames} frames");
    }

    /// One frame, all nine steps. Public for host tests that drive the
    /// scheduler without wall-clock timing.
    pub fn render_frame(&mut self, dt: f32) {
        self.time += dt;

        // Commands land at frame boundaries, never mid-frame.
        self.bus.drain(&mut self.cmd_buf);
        let mut cmds = std::mem::take(&mut self.cmd_buf);
        for cmd in cmds.drain(..) {
            self.apply_command(cmd);
        }
        self.cmd_buf = cmds;

        // Exactly one snapshot version per frame.
        let audio = self.snapshot.read();
        self.stats.set_audio_hop(audio.monotonic_hop_index);

        let palette = self.palette.active();
        let mut registry = match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Buffer-reset policy by declared statefulness.
        let meta = registry.meta(self.current_id);
        if !meta.is_some_and(|m| m.stateful) {
            self.live.clear();
        }
        if let Some(effect) = registry.effect_mut(self.current_id) {
            let mut ctx = EffectContext {
                frame: &mut self.live,
                audio: &audio,
                palette,
                dt,
                time: self.time,
            };
            effect.render(&mut ctx);
        }

        // Timed cross-fade: previous composites into scratch, then the
        // eased weight blends it under the current output.
        let mut fade_done = false;
        if let Some(active) = &mut self.transition {
            let weight = active.fade.advance(dt);
            match active.prev {
                PrevSource::Effect(prev_id) => {
                    if !registry.meta(prev_id).is_some_and(|m| m.stateful) {
                        self.scratch.clear();
                    }
                    if let Some(prev) = registry.effect_mut(prev_id) {
                        let mut ctx = EffectContext {
                            frame: &mut self.scratch,
                            audio: &audio,
                            palette,
                            dt,
                            time: self.time,
                        };
                        prev.render(&mut ctx);
                    }
                }
                PrevSource::Frozen => self.scratch.px = self.frozen.px,
            }
            for (dst, src) in self.live.px.iter_mut().zip(self.scratch.px.iter()) {
                *dst = src.lerp(*dst, weight);
            }
            fade_done = active.fade.done();
        }
        if fade_done {
            // Previous effect is dropped; its slot stays resident.
            self.transition = None;
        }
        let opt_out = meta.is_some_and(|m| m.lgp_sensitive || m.stateful);
        drop(registry);

        // Output copy: brightness and correction never touch `live`.
        let back = self.writer.back_mut();
        back.px = self.live.px;
        if self.brightness < 255 {
            back.fade(f32::from(self.brightness) / 255.0);
        }
        if self.cfg.correction_enabled {
            self.corrector
                .set_params(CorrectionParams::from_store(&self.tunables));
            self.corrector.apply(back, opt_out);
        }

        self.writer.publish();
        self.stream.maybe_publish(self.writer.back(), Instant::now());
    }

    fn apply_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetEffect { id, transition } => self.set_effect(id, transition),
            Command::SetPalette(id) => self.palette.set_active(id),
            Command::SetBrightness(b) => self.brightness = b,
            Command::SetParam {
                effect_id,
                name,
                value,
            } => {
                let mut registry = match self.registry.lock() {
                    Ok(g) => g,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match registry.effect_mut(effect_id) {
                    Some(effect) => {
                        if let Err(e) = effect.set_param(&name, value) {
                            // Recovered locally: the effect keeps its
                            // last-good value.
                            log::warn!("set_param {effect_id}/{name}: {e}");
                        }
                    }
                    None => log::warn!("set_param: unknown effect {effect_id}"),
                }
            }
            Command::ReloadPlugins => {
                if let Some(tx) = &self.reload_tx {
                    let _ = tx.try_send(());
                } else {
                    self.plugins.reload();
                }
            }
            Command::StreamSubscribe => {
                if self.cfg.stream_enabled {
                    self.stream.subscribe();
                } else {
                    log::warn!("led stream disabled by config, subscribe ignored");
                }
            }
            Command::StreamUnsubscribe => self.stream.unsubscribe(),
        }
    }

    fn set_effect(&mut self, id: u8, transition: Option<crate::command::TransitionSpec>) {
        let known = {
            let registry = match self.registry.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.meta(id).is_some()
        };
        if !known {
            log::warn!("set_effect: unknown id {id}");
            return;
        }
        if !self.plugins.active().is_enabled(id) {
            log::warn!("set_effect: id {id} disabled by override, refused");
            return;
        }
        if id == self.current_id {
            return;
        }

        match transition {
            Some(spec) if spec.duration_ms > 0 => {
                let curve = Curve::from_index(spec.curve).unwrap_or_default();
                let prev = if self.transition.is_some() {
                    // Retarget mid-fade: freeze the in-progress blend as
                    // the new "previous" — never an abrupt flash.
                    self.frozen.px = self.live.px;
                    PrevSource::Frozen
                } else {
                    PrevSource::Effect(self.current_id)
                };
                self.transition = Some(ActiveTransition {
                    prev,
                    fade: Transition::new(f64::from(spec.duration_ms) as f32 / 1000.0, curve),
                });
            }
            _ => self.transition = None,
        }
        log::info!("effect {} -> {}", self.current_id, id);
        self.current_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandBus, CommandSender, TransitionSpec};
    use lw_core::frame::{FramePair, FrameReader};
    use lw_core::pixel::Rgb8;
    use lw_core::snapshot::SnapshotBuffer;
    use lw_core::tunables::TunableValue;
    use lw_effects::effects::register_builtins;

    const FRAME_DT: f32 = 1.0 / 120.0;

    struct Harness {
        renderer: Renderer,
        tx: CommandSender,
        front: FrameReader,
    }

    fn harness(cfg: RendererConfig) -> Harness {
        let mut registry = EffectRegistry::new();
        register_builtins(&mut registry);
        let registered = registry.registered_ids();
        let registry: SharedRegistry = Arc::new(Mutex::new(registry));

        // Nonexistent directory: a valid, empty manifest set.
        let plugins = Arc::new(PluginManager::new(
            std::env::temp_dir().join("lw-render-test-no-plugins"),
            registered,
        ));
        let tunables = Arc::new(TunableStore::new(None, 1));
        CorrectionParams::register_tunables(&tunables);

        let (_writer, reader) = SnapshotBuffer::split();
        let (frame_writer, front) = FramePair::split();
        let (tx, bus) = CommandBus::new(32);
        let (stream, _stream_rx) = LedStreamPublisher::new(Duration::from_millis(50), 4);

        let renderer = Renderer::new(
            cfg,
            registry,
            plugins,
            tunables,
            reader,
            frame_writer,
            bus,
            ShutdownFlag::new(),
            stream,
            None,
        );
        Harness {
            renderer,
            tx,
            front,
        }
    }

    fn make_solid_red(h: &mut Harness) {
        h.tx.send(Command::SetEffect {
            id: 5,
            transition: None,
        });
        for (name, v) in [("red", 255u8), ("green", 0), ("blue", 0)] {
            h.tx.send(Command::SetParam {
                effect_id: 5,
                name: name.to_string(),
                value: TunableValue::U8(v),
            });
        }
        h.renderer.render_frame(FRAME_DT);
    }

    #[test]
    fn boot_defaults_publish_a_complete_frame() {
        let mut h = harness(RendererConfig::default());
        for _ in 0..12 {
            h.renderer.render_frame(FRAME_DT);
        }
        assert_eq!(h.renderer.current_effect(), 0);
        // Every LED holds a defined value (black or the idle pattern).
        let frame = h.front.front();
        assert_eq!(frame.px.len(), 320);
    }

    #[test]
    fn transition_blends_midway_and_finalises() {
        let mut h = harness(RendererConfig {
            correction_enabled: false,
            brightness: 255,
            ..RendererConfig::default()
        });
        make_solid_red(&mut h);
        assert_eq!(h.front.front().px[0], Rgb8::new(255, 0, 0));

        // Fade to tempo-strobe (renders black in silence) over 500 ms.
        h.tx.send(Command::SetEffect {
            id: 10,
            transition: Some(TransitionSpec {
                duration_ms: 500,
                curve: 0,
            }),
        });
        // 250 ms in: the pixel sits halfway between red and black.
        let mut elapsed = 0.0f32;
        while elapsed < 0.25 - 1e-6 {
            h.renderer.render_frame(0.025);
            elapsed += 0.025;
        }
        let mid = h.front.front().px[0];
        assert!(mid.r.abs_diff(127) <= 8, "mid {mid:?}");
        assert_eq!(mid.b, 0);

        // Past 500 ms: fully arrived, previous dropped.
        while elapsed < 0.55 {
            h.renderer.render_frame(0.025);
            elapsed += 0.025;
        }
        assert_eq!(h.front.front().px[0], Rgb8::new(0, 0, 0));
        assert!(h.renderer.transition.is_none());
    }

    #[test]
    fn retarget_mid_fade_freezes_blend_without_flash() {
        let mut h = harness(RendererConfig {
            correction_enabled: false,
            ..RendererConfig::default()
        });
        make_solid_red(&mut h);

        h.tx.send(Command::SetEffect {
            id: 10,
            transition: Some(TransitionSpec {
                duration_ms: 400,
                curve: 0,
            }),
        });
        for _ in 0..8 {
            h.renderer.render_frame(0.025);
        }
        let before = h.front.front().px[0];

        // Retarget to effect 8 mid-fade: next frame must stay close to
        // the in-progress blend, never snap.
        h.tx.send(Command::SetEffect {
            id: 8,
            transition: Some(TransitionSpec {
                duration_ms: 400,
                curve: 0,
            }),
        });
        h.renderer.render_frame(0.025);
        let after = h.front.front().px[0];
        assert!(
            before.r.abs_diff(after.r) < 40,
            "flash: {before:?} -> {after:?}"
        );
    }

    #[test]
    fn correction_never_touches_the_live_buffer() {
        let mut h = harness(RendererConfig::default());
        // Gamma on, solid mid-grey: the published copy darkens, the
        // effect-input buffer keeps its raw value.
        h.tx.send(Command::SetEffect {
            id: 5,
            transition: None,
        });
        h.renderer.render_frame(FRAME_DT);
        h.renderer.render_frame(FRAME_DT);

        assert_eq!(h.renderer.live.px[0], Rgb8::new(128, 128, 128));
        let published = h.front.front().px[0];
        assert!(published.r < 128);
    }

    #[test]
    fn disabled_by_override_is_refused() {
        let mut h = harness(RendererConfig::default());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("only.plugin.json"),
            r#"{ "mode": "override", "plugin": { "name": "only" },
                 "effects": [ { "id": 0 }, { "id": 1 } ] }"#,
        )
        .unwrap();
        let registered = {
            let reg = h.renderer.registry.lock().unwrap();
            reg.registered_ids()
        };
        h.renderer.plugins = Arc::new(PluginManager::new(dir.path(), registered));
        h.renderer.plugins.reload();

        h.tx.send(Command::SetEffect {
            id: 5,
            transition: None,
        });
        h.renderer.render_frame(FRAME_DT);
        assert_eq!(h.renderer.current_effect(), 0); // refused, unchanged

        h.tx.send(Command::SetEffect {
            id: 1,
            transition: None,
        });
        h.renderer.render_frame(FRAME_DT);
        assert_eq!(h.renderer.current_effect(), 1);
    }

    #[test]
    fn unknown_effect_id_is_ignored() {
        let mut h = harness(RendererConfig::default());
        h.tx.send(Command::SetEffect {
            id: 127,
            transition: None,
        });
        h.renderer.render_frame(FRAME_DT);
        assert_eq!(h.renderer.current_effect(), 0);
    }

    #[test]
    fn brightness_scales_output_only() {
        let mut h = harness(RendererConfig {
            correction_enabled: false,
            ..RendererConfig::default()
        });
        make_solid_red(&mut h);
        h.tx.send(Command::SetBrightness(128));
        h.renderer.render_frame(FRAME_DT);
        let published = h.front.front().px[0];
        assert!(published.r < 140);
        assert_eq!(h.renderer.live.px[0].r, 255);
    }
}
