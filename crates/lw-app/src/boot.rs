use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use lw_api::Api;
use lw_audio::{
    AudioConfig, AudioParams, AudioPipeline, SampleSource, SilenceSource, ToneSource,
};
use lw_core::config::EngineConfig;
use lw_core::frame::FramePair;
use lw_core::snapshot::SnapshotBuffer;
use lw_core::tunables::{TunableDesc, TunableStore, TunableValue};
use lw_effects::effects::register_builtins;
use lw_effects::registry::EffectRegistry;
use lw_plugin::PluginManager;
use lw_render::command::CommandBus;
use lw_render::correction::CorrectionParams;
use lw_render::scheduler::{Renderer, RendererConfig, SharedRegistry};
use lw_render::ShutdownFlag;
use lw_render::stream::LedStreamPublisher;

use crate::cli::Cli;

/// Epoch stamped into persisted tunables; bump when descriptors move.
const FIRMWARE_EPOCH: u32 = 3;

/// Debounce window for tunable write-back.
const FLUSH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Assemble every subsystem, spawn the two pinned tasks plus the driver
/// sink, then run housekeeping on this thread until shutdown.
pub fn run(cli: &Cli, config: &EngineConfig) -> Result<()> {
    // === Tunable store ===
    let tunable_path = cli
        .tunables
        .clone()
        .or_else(|| {
            if config.tunable_path.is_empty() {
                None
            } else {
                Some(PathBuf::from(&config.tunable_path))
            }
        });
    let tunables = Arc::new(TunableStore::new(tunable_path, FIRMWARE_EPOCH));
    register_render_tunables(&tunables, config);
    register_audio_tunables(&tunables);
    CorrectionParams::register_tunables(&tunables);
    tunables.load();

    // === Effect registry (boot order = id contract) ===
    let mut registry = EffectRegistry::new();
    register_builtins(&mut registry);
    let registered = registry.registered_ids();
    log::info!("{} builtin effects registered", registry.len());
    let registry: SharedRegistry = Arc::new(Mutex::new(registry));

    // === Plugin manager + initial reload ===
    let plugin_dir = cli
        .plugin_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.plugin_dir));
    let plugins = Arc::new(PluginManager::new(plugin_dir.clone(), registered));
    let report = plugins.reload();
    if !report.ok {
        log::warn!(
            "initial plugin reload found {} invalid manifest(s); full builtin set stays active",
            report.files.iter().filter(|f| f.error.is_some()).count()
        );
    }

    // === Cross-core plumbing ===
    let (frame_writer, mut frame_reader) = FramePair::split();
    let (snapshot_writer, snapshot_reader) = SnapshotBuffer::split();
    let (cmd_tx, cmd_bus) = CommandBus::new(64);
    let shutdown = ShutdownFlag::new();
    let (reload_tx, reload_rx) = flume::bounded::<()>(2);
    let (stream_pub, stream_rx) = LedStreamPublisher::new(
        Duration::from_millis(config.stream_min_interval_ms),
        4,
    );

    // === Audio task ===
    let (audio_tx, audio_rx) = flume::bounded(8);
    let audio_params = audio_params_from_store(&tunables);
    let mut audio_handle = None;
    if config.audio_enabled {
        let source = make_source(&cli.audio, config.sample_rate)?;
        let pipeline = AudioPipeline::new(
            AudioConfig {
                sample_rate: config.sample_rate,
                window_size: config.window_size,
                hop_size: config.hop_size,
                heavy_every: config.heavy_every,
            },
            audio_params,
            source,
            snapshot_writer,
            audio_rx,
            shutdown.inner(),
        );
        audio_handle = Some(pipeline.spawn().context("spawn audio task")?);
    } else {
        log::info!("audio disabled: snapshot stays silent");
    }

    // === Render task ===
    let target_fps = cli.fps.unwrap_or(config.target_fps);
    let brightness = tunables
        .get::<u8>("render.brightness")
        .unwrap_or(config.brightness);
    let renderer = Renderer::new(
        RendererConfig {
            target_fps,
            boot_effect_id: config.boot_effect_id,
            boot_palette_id: config.boot_palette_id,
            brightness,
            correction_enabled: config.correction_enabled,
            stream_enabled: config.stream_enabled,
        },
        Arc::clone(&registry),
        Arc::clone(&plugins),
        Arc::clone(&tunables),
        snapshot_reader,
        frame_writer,
        cmd_bus,
        shutdown.clone(),
        stream_pub,
        Some(reload_tx.clone()),
    );
    let stats = renderer.shared_stats();
    let render_handle = renderer.spawn().context("spawn render task")?;

    // === Driver sink (stand-in for the DMA driver) ===
    let driver_shutdown = shutdown.clone();
    let driver_period = Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)));
    let driver_handle = std::thread::Builder::new()
        .name("lw-driver".to_string())
        .spawn(move || {
            while !driver_shutdown.is_requested() {
                // The driver sees only complete frames between swaps.
                let _frame = frame_reader.front();
                std::thread::sleep(driver_period);
            }
        })
        .context("spawn driver sink")?;

    // === Stream sink (stand-in for the WS transport) ===
    let stream_handle = std::thread::Builder::new()
        .name("lw-stream".to_string())
        .spawn(move || {
            // Ends when the renderer drops the publisher.
            for _frame in stream_rx.iter() {}
        })
        .context("spawn stream sink")?;

    // === API service (the transport embeds this) ===
    let api = Api::new(
        Arc::clone(&registry),
        Arc::clone(&plugins),
        cmd_tx.clone(),
        Arc::clone(&stats),
        Some(audio_tx.clone()),
        audio_params,
        None,
    );

    // === Plugin-dir watcher ===
    let _watcher = match crate::hotreload::spawn_plugin_watcher(&plugin_dir, reload_tx.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            log::warn!("manifest watcher unavailable: {e}");
            None
        }
    };

    // === Shutdown signal ===
    let ctrlc_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        ctrlc_flag.request();
    })
    .context("install ctrl-c handler")?;

    // === Housekeeping: flushes, reloads, periodic status ===
    let mut ticks = 0u64;
    while !shutdown.is_requested() {
        std::thread::sleep(Duration::from_millis(100));
        ticks += 1;

        tunables.flush_if_due(FLUSH_DEBOUNCE);

        if reload_rx.try_recv().is_ok() {
            // Drain coalesced requests, reload once.
            while reload_rx.try_recv().is_ok() {}
            plugins.reload();
        }

        if ticks % 50 == 0
            && let Some(data) = api.system_stats().data
        {
            log::info!(
                "fps {:.1}, drops {}, hop {}",
                data["fps"].as_f64().unwrap_or(0.0),
                data["frame_drops"],
                data["audio_hop_index"],
            );
        }
    }

    // Both tasks complete their current frame/hop, then exit.
    render_handle.join().ok();
    if let Some(handle) = audio_handle {
        handle.join().ok();
    }
    driver_handle.join().ok();
    stream_handle.join().ok();
    tunables.flush_now();
    log::info!("clean shutdown");
    Ok(())
}

fn make_source(spec: &str, sample_rate: u32) -> Result<Box<dyn SampleSource>> {
    match spec {
        "silence" => Ok(Box::new(SilenceSource::new(sample_rate, true))),
        "mic" => mic_source(),
        other => {
            if let Some(hz) = other.strip_prefix("tone:") {
                let freq: f32 = hz.parse().context("tone frequency")?;
                Ok(Box::new(ToneSource::new(freq, 0.4, sample_rate).realtime()))
            } else {
                anyhow::bail!("unknown audio source '{other}'")
            }
        }
    }
}

#[cfg(feature = "capture")]
fn mic_source() -> Result<Box<dyn SampleSource>> {
    Ok(Box::new(lw_audio::capture::MicCapture::start_default()?))
}

#[cfg(not(feature = "capture"))]
fn mic_source() -> Result<Box<dyn SampleSource>> {
    anyhow::bail!("built without the `capture` feature, --audio mic unavailable")
}

fn register_render_tunables(store: &TunableStore, config: &EngineConfig) {
    let _ = store.register(TunableDesc {
        name: "render.brightness",
        group: "render",
        default: TunableValue::U8(config.brightness),
        min: Some(TunableValue::U8(0)),
        max: Some(TunableValue::U8(255)),
        persistent: true,
    });
}

fn register_audio_tunables(store: &TunableStore) {
    let defaults = AudioParams::default();
    let f32_desc = |name, default, min, max| TunableDesc {
        name,
        group: "audio",
        default: TunableValue::F32(default),
        min: Some(TunableValue::F32(min)),
        max: Some(TunableValue::F32(max)),
        persistent: true,
    };
    let _ = store.register(f32_desc("audio.adaptive_rise", defaults.adaptive_rise, 0.001, 1.0));
    let _ = store.register(f32_desc("audio.adaptive_fall", defaults.adaptive_fall, 0.001, 1.0));
    let _ = store.register(f32_desc("audio.adaptive_floor", defaults.adaptive_floor, 0.0001, 0.5));
    let _ = store.register(f32_desc("audio.adaptive_scale", defaults.adaptive_scale, 0.1, 2.0));
    let _ = store.register(f32_desc("audio.presence_enter", defaults.presence_enter, 0.001, 0.5));
    let _ = store.register(f32_desc("audio.presence_exit", defaults.presence_exit, 0.0005, 0.5));
    let _ = store.register(f32_desc("audio.chord_alpha", defaults.chord_alpha, 0.01, 1.0));
}

fn audio_params_from_store(store: &TunableStore) -> AudioParams {
    let defaults = AudioParams::default();
    AudioParams {
        adaptive_rise: store
            .get("audio.adaptive_rise")
            .unwrap_or(defaults.adaptive_rise),
        adaptive_fall: store
            .get("audio.adaptive_fall")
            .unwrap_or(defaults.adaptive_fall),
        adaptive_floor: store
            .get("audio.adaptive_floor")
            .unwrap_or(defaults.adaptive_floor),
        adaptive_scale: store
            .get("audio.adaptive_scale")
            .unwrap_or(defaults.adaptive_scale),
        presence_enter: store
            .get("audio.presence_enter")
            .unwrap_or(defaults.presence_enter),
        presence_exit: store
            .get("audio.presence_exit")
            .unwrap_or(defaults.presence_exit),
        chord_alpha: store.get("audio.chord_alpha").unwrap_or(defaults.chord_alpha),
    }
}
