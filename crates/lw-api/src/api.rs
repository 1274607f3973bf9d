use std::sync::{Arc, Mutex};

use lw_audio::{AudioCommand, AudioParams, AudioParamsUpdate};
use lw_core::error::CoreError;
use lw_core::palette::PALETTES;
use lw_plugin::PluginManager;
use lw_render::command::{Command, CommandSender, TransitionSpec};
use lw_render::scheduler::SharedRegistry;
use lw_render::stats::SharedStats;

use crate::dto::{
    EffectInfo, PaletteInfo, ParamInfo, SetEffectBody, SystemStats, json_to_value, value_to_json,
};
use crate::envelope::ApiResponse;

/// Le service derrière REST et WebSocket. Chaque méthode est un handler
/// synchrone : validation ici, application au début de la frame suivante
/// via le bus de commandes.
pub struct Api {
    registry: SharedRegistry,
    plugins: Arc<PluginManager>,
    bus: CommandSender,
    stats: Arc<SharedStats>,
    audio_tx: Option<flume::Sender<AudioCommand>>,
    /// Last-known audio parameters, authoritative for GET.
    audio_params: Arc<Mutex<AudioParams>>,
    /// Free-heap probe; `None` reports 0 (host builds).
    mem_probe: Option<fn() -> u64>,
}

impl Api {
    /// Wire the service to the live subsystem handles.
    #[must_use]
    pub fn new(
        registry: SharedRegistry,
        plugins: Arc<PluginManager>,
        bus: CommandSender,
        stats: Arc<SharedStats>,
        audio_tx: Option<flume::Sender<AudioCommand>>,
        audio_params: AudioParams,
        mem_probe: Option<fn() -> u64>,
    ) -> Self {
        Self {
            registry,
            plugins,
            bus,
            stats,
            audio_tx,
            audio_params: Arc::new(Mutex::new(audio_params)),
            mem_probe,
        }
    }

    /// `GET /effects`
    #[must_use]
    pub fn effects_list(&self) -> ApiResponse {
        let active = self.plugins.active();
        let registry = self.lock_registry();
        let list: Vec<EffectInfo> = registry
            .iter_meta()
            .map(|(id, meta)| {
                let parameters = registry.effect(id).map_or_else(Vec::new, |e| {
                    e.param_descriptors()
                        .iter()
                        .map(|d| ParamInfo::from_descriptor(d, e.get_param(d.name)))
                        .collect()
                });
                EffectInfo::new(
                    id,
                    meta,
                    active.is_enabled(id),
                    active.disabled_by_override(id),
                    parameters,
                )
            })
            .collect();
        drop(registry);
        ApiResponse::ok(serde_json::json!({ "effects": list }))
    }

    /// `POST /effects/current`
    #[must_use]
    pub fn set_current_effect(&self, body: &SetEffectBody) -> ApiResponse {
        {
            let registry = self.lock_registry();
            if registry.meta(body.id).is_none() {
                return ApiResponse::err(&CoreError::not_found(format!("effect {}", body.id)));
            }
        }
        if !self.plugins.active().is_enabled(body.id) {
            return ApiResponse::err(&CoreError::not_found(format!(
                "effect {} (disabled by override)",
                body.id
            )));
        }
        self.bus.send(Command::SetEffect {
            id: body.id,
            transition: body.transition.map(|t| TransitionSpec {
                duration_ms: t.duration_ms,
                curve: t.curve_id,
            }),
        });
        ApiResponse::ok(serde_json::json!({ "id": body.id }))
    }

    /// `GET /effects/{id}/parameters`
    #[must_use]
    pub fn effect_params(&self, id: u8) -> ApiResponse {
        let registry = self.lock_registry();
        let Some(effect) = registry.effect(id) else {
            return ApiResponse::err(&CoreError::not_found(format!("effect {id}")));
        };
        let params: Vec<ParamInfo> = effect
            .param_descriptors()
            .iter()
            .map(|d| ParamInfo::from_descriptor(d, effect.get_param(d.name)))
            .collect();
        drop(registry);
        ApiResponse::ok(serde_json::json!({ "id": id, "parameters": params }))
    }

    /// `POST /effects/{id}/parameters/{name}`
    ///
    /// Validation is synchronous (the caller gets the error); the write
    /// itself lands at the next frame boundary through the bus.
    #[must_use]
    pub fn set_effect_param(&self, id: u8, name: &str, value: &serde_json::Value) -> ApiResponse {
        let typed = {
            let registry = self.lock_registry();
            let Some(effect) = registry.effect(id) else {
                return ApiResponse::err(&CoreError::not_found(format!("effect {id}")));
            };
            let Some(desc) = lw_effects::params::find(effect.param_descriptors(), name) else {
                return ApiResponse::err(&CoreError::not_found(format!("parameter '{name}'")));
            };
            match json_to_value(name, desc.default, value).and_then(|v| {
                desc.validate(v)?;
                Ok(v)
            }) {
                Ok(v) => v,
                Err(e) => return ApiResponse::err(&e),
            }
        };
        self.bus.send(Command::SetParam {
            effect_id: id,
            name: name.to_string(),
            value: typed,
        });
        ApiResponse::ok(serde_json::json!({ "id": id, "name": name, "value": value_to_json(typed) }))
    }

    /// `GET /palettes`
    #[must_use]
    pub fn palettes_list(&self) -> ApiResponse {
        let list: Vec<PaletteInfo> = PALETTES
            .iter()
            .map(|p| PaletteInfo {
                id: p.id,
                name: p.name,
                entries: p.entries.iter().map(|c| [c.r, c.g, c.b]).collect(),
            })
            .collect();
        ApiResponse::ok(serde_json::json!({ "palettes": list }))
    }

    /// `POST /palette/current`
    #[must_use]
    pub fn set_palette(&self, id: u8) -> ApiResponse {
        if usize::from(id) >= PALETTES.len() {
            return ApiResponse::err(&CoreError::not_found(format!("palette {id}")));
        }
        self.bus.send(Command::SetPalette(id));
        ApiResponse::ok(serde_json::json!({ "id": id }))
    }

    /// `POST /brightness`
    #[must_use]
    pub fn set_brightness(&self, value: u8) -> ApiResponse {
        self.bus.send(Command::SetBrightness(value));
        ApiResponse::ok(serde_json::json!({ "brightness": value }))
    }

    /// `GET /audio/parameters`
    #[must_use]
    pub fn audio_params(&self) -> ApiResponse {
        let params = *self.lock_audio_params();
        match serde_json::to_value(params) {
            Ok(v) => ApiResponse::ok(serde_json::json!({ "pipeline": v })),
            Err(e) => ApiResponse::err(&CoreError::InvalidManifest(e.to_string())),
        }
    }

    /// `POST /audio/parameters` — accepts a nested `pipeline` object or
    /// the same fields flat at top level.
    #[must_use]
    pub fn set_audio_params(&self, body: &serde_json::Value) -> ApiResponse {
        let fields = body.get("pipeline").unwrap_or(body);
        let update: AudioParamsUpdate = match serde_json::from_value(fields.clone()) {
            Ok(u) => u,
            Err(e) => {
                return ApiResponse::err(&CoreError::TypeMismatch {
                    name: "audio.parameters".to_string(),
                    expected: "pipeline fields",
                    got: "invalid body",
                })
                .with_message(e.to_string());
            }
        };
        {
            let mut params = self.lock_audio_params();
            update.apply(&mut params);
        }
        if let Some(tx) = &self.audio_tx {
            let _ = tx.try_send(AudioCommand::SetParams(update));
        }
        let params = *self.lock_audio_params();
        match serde_json::to_value(params) {
            Ok(v) => ApiResponse::ok(serde_json::json!({ "pipeline": v })),
            Err(e) => ApiResponse::err(&CoreError::InvalidManifest(e.to_string())),
        }
    }

    /// `GET /plugins`
    #[must_use]
    pub fn plugins_stats(&self) -> ApiResponse {
        let active = self.plugins.active();
        ApiResponse::ok(serde_json::json!({
            "mode": format!("{:?}", active.mode).to_lowercase(),
            "enabled_count": active.enabled_count(),
            "registered_count": active.registered.count_ones(),
            "manifest_count": active.stats.manifest_count,
            "last_reload_ok": active.stats.ok,
        }))
    }

    /// `GET /plugins/manifests`
    #[must_use]
    pub fn plugin_manifests(&self) -> ApiResponse {
        let report = self.plugins.last_report();
        let files: Vec<serde_json::Value> = report
            .files
            .iter()
            .map(|f| {
                serde_json::json!({
                    "file": f.path.display().to_string(),
                    "plugin": f.plugin_name,
                    "valid": f.error.is_none(),
                    "error": f.error.as_ref().map(|e| format!("{}: {e}", e.detail())),
                })
            })
            .collect();
        ApiResponse::ok(serde_json::json!({ "ok": report.ok, "manifests": files }))
    }

    /// `POST /plugins/reload`
    #[must_use]
    pub fn plugins_reload(&self) -> ApiResponse {
        let report = self.plugins.reload();
        let errors: Vec<serde_json::Value> = report
            .files
            .iter()
            .filter_map(|f| {
                f.error.as_ref().map(|e| {
                    serde_json::json!({
                        "file": f.path.display().to_string(),
                        "error": format!("{}: {e}", e.detail()),
                    })
                })
            })
            .collect();
        let active = self.plugins.active();
        let body = serde_json::json!({
            "ok": report.ok,
            "stats": {
                "manifest_count": active.stats.manifest_count,
                "enabled_count": active.enabled_count(),
                "error_count": errors.len(),
            },
            "errors": errors,
        });
        if report.ok {
            ApiResponse::ok(body)
        } else {
            let mut resp =
                ApiResponse::err(&CoreError::InvalidManifest("reload aborted".to_string()));
            resp.data = Some(body);
            resp
        }
    }

    /// `GET /system/stats`
    #[must_use]
    pub fn system_stats(&self) -> ApiResponse {
        use std::sync::atomic::Ordering;
        let stats = SystemStats {
            fps: self.stats.fps(),
            frame_drops: self.stats.frame_drops.load(Ordering::Relaxed),
            max_frame_us: self.stats.max_frame_us.load(Ordering::Relaxed),
            p95_frame_us: self.stats.p95_frame_us.load(Ordering::Relaxed),
            free_heap_bytes: self.mem_probe.map_or(0, |probe| probe()),
            audio_hop_index: self.stats.audio_hop.load(Ordering::Relaxed),
        };
        match serde_json::to_value(stats) {
            Ok(v) => ApiResponse::ok(v),
            Err(e) => ApiResponse::err(&CoreError::InvalidManifest(e.to_string())),
        }
    }

    /// Queue a LED-stream subscribe/unsubscribe.
    #[must_use]
    pub fn stream_subscription(&self, subscribe: bool) -> ApiResponse {
        self.bus.send(if subscribe {
            Command::StreamSubscribe
        } else {
            Command::StreamUnsubscribe
        });
        ApiResponse::ok(serde_json::json!({ "subscribed": subscribe }))
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, lw_effects::registry::EffectRegistry> {
        match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_audio_params(&self) -> std::sync::MutexGuard<'_, AudioParams> {
        match self.audio_params.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ApiResponse {
    /// Replace the error message, keeping the code (serde detail passthrough).
    #[must_use]
    fn with_message(mut self, message: String) -> Self {
        if let Some(e) = &mut self.error {
            e.message = message;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_effects::effects::register_builtins;
    use lw_effects::registry::EffectRegistry;
    use lw_render::command::CommandBus;

    fn api() -> (Api, lw_render::command::CommandBus) {
        let mut registry = EffectRegistry::new();
        register_builtins(&mut registry);
        let registered = registry.registered_ids();
        let registry: SharedRegistry = Arc::new(Mutex::new(registry));
        let plugins = Arc::new(PluginManager::new(
            std::env::temp_dir().join("lw-api-test-no-plugins"),
            registered,
        ));
        let (tx, bus) = CommandBus::new(32);
        let api = Api::new(
            registry,
            plugins,
            tx,
            Arc::new(SharedStats::default()),
            None,
            AudioParams::default(),
            None,
        );
        (api, bus)
    }

    #[test]
    fn effects_list_carries_descriptors() {
        let (api, _bus) = api();
        let resp = api.effects_list();
        assert!(resp.success);
        let data = resp.data.unwrap();
        let effects = data["effects"].as_array().unwrap();
        assert_eq!(effects.len(), 11);
        assert_eq!(effects[0]["name"], "aurora");
        assert!(effects[0]["parameters"].as_array().unwrap().len() >= 2);
        assert_eq!(effects[0]["enabled"], true);
    }

    #[test]
    fn unknown_effect_is_404() {
        let (api, _bus) = api();
        let resp = api.set_current_effect(&SetEffectBody {
            id: 128,
            transition: None,
        });
        assert!(!resp.success);
        assert_eq!(resp.http_status(), 404);
    }

    #[test]
    fn param_validation_is_synchronous() {
        let (api, bus) = api();
        // Out of range: gain max is 4.0 on spectrum-bloom.
        let resp = api.set_effect_param(1, "gain", &serde_json::json!(99.0));
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, "OutOfRange");

        // Wrong kind.
        let resp = api.set_effect_param(1, "adaptive", &serde_json::json!(3));
        assert_eq!(resp.error.unwrap().code, "TypeMismatch");

        // Nothing was queued for the failures.
        let mut out = Vec::new();
        bus.drain(&mut out);
        assert!(out.is_empty());

        // A valid write queues exactly one command.
        let resp = api.set_effect_param(1, "gain", &serde_json::json!(2.0));
        assert!(resp.success);
        bus.drain(&mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn audio_params_accept_nested_and_flat() {
        let (api, _bus) = api();
        let resp = api.set_audio_params(&serde_json::json!({
            "pipeline": { "adaptive_rise": 0.5 }
        }));
        assert!(resp.success);
        let resp = api.set_audio_params(&serde_json::json!({ "adaptive_fall": 0.05 }));
        assert!(resp.success);
        let data = resp.data.unwrap();
        assert!((data["pipeline"]["adaptive_rise"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!((data["pipeline"]["adaptive_fall"].as_f64().unwrap() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn palette_bounds_are_checked() {
        let (api, _bus) = api();
        assert!(!api.set_palette(200).success);
        assert!(api.set_palette(3).success);
    }

    #[test]
    fn system_stats_shape() {
        let (api, _bus) = api();
        let resp = api.system_stats();
        let data = resp.data.unwrap();
        assert!(data.get("fps").is_some());
        assert!(data.get("free_heap_bytes").is_some());
        assert!(data.get("audio_hop_index").is_some());
    }
}
