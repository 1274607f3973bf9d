use serde::Deserialize;

use crate::api::Api;
use crate::dto::{SetEffectBody, TransitionDto};
use crate::envelope::ApiResponse;

/// Messages WebSocket entrants, étiquetés par `type`. Miroir du REST —
/// même validation, même enveloppe de réponse.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WsRequest {
    /// Select an effect.
    #[serde(rename = "effect.set")]
    EffectSet {
        /// Target effect id.
        id: u8,
        /// Optional cross-fade.
        #[serde(default)]
        transition: Option<TransitionDto>,
    },
    /// Select the active palette.
    #[serde(rename = "palette.set")]
    PaletteSet {
        /// Palette id.
        id: u8,
    },
    /// Set one effect parameter.
    #[serde(rename = "param.set")]
    ParamSet {
        /// Owning effect id.
        effect_id: u8,
        /// Parameter name.
        name: String,
        /// New value.
        value: serde_json::Value,
    },
    /// Re-scan the plugin directory.
    #[serde(rename = "plugins.reload")]
    PluginsReload,
    /// Start receiving `ledStream.frame` binary pushes.
    #[serde(rename = "ledStream.subscribe")]
    LedStreamSubscribe,
    /// Stop receiving the LED stream.
    #[serde(rename = "ledStream.unsubscribe")]
    LedStreamUnsubscribe,
}

/// Dispatch one parsed WebSocket request to the service.
#[must_use]
pub fn handle(api: &Api, req: WsRequest) -> ApiResponse {
    match req {
        WsRequest::EffectSet { id, transition } => {
            api.set_current_effect(&SetEffectBody { id, transition })
        }
        WsRequest::PaletteSet { id } => api.set_palette(id),
        WsRequest::ParamSet {
            effect_id,
            name,
            value,
        } => api.set_effect_param(effect_id, &name, &value),
        WsRequest::PluginsReload => api.plugins_reload(),
        WsRequest::LedStreamSubscribe => api.stream_subscription(true),
        WsRequest::LedStreamUnsubscribe => api.stream_subscription(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_parse_by_type_tag() {
        let req: WsRequest = serde_json::from_str(
            r#"{ "type": "effect.set", "id": 3, "transition": { "duration_ms": 250, "curve_id": 2 } }"#,
        )
        .unwrap();
        assert!(matches!(req, WsRequest::EffectSet { id: 3, .. }));

        let req: WsRequest =
            serde_json::from_str(r#"{ "type": "ledStream.subscribe" }"#).unwrap();
        assert!(matches!(req, WsRequest::LedStreamSubscribe));

        let req: WsRequest = serde_json::from_str(
            r#"{ "type": "param.set", "effect_id": 1, "name": "gain", "value": 2.0 }"#,
        )
        .unwrap();
        assert!(matches!(req, WsRequest::ParamSet { .. }));
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let r: Result<WsRequest, _> = serde_json::from_str(r#"{ "type": "nope" }"#);
        assert!(r.is_err());
    }
}
