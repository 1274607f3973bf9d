use lw_core::error::CoreError;
use lw_core::tunables::TunableValue;
use lw_effects::meta::EffectMeta;
use lw_effects::params::ParamDescriptor;
use serde::{Deserialize, Serialize};

/// Conversion TunableValue → JSON.
#[must_use]
pub fn value_to_json(v: TunableValue) -> serde_json::Value {
    match v {
        TunableValue::Bool(b) => serde_json::Value::from(b),
        TunableValue::U8(n) => serde_json::Value::from(n),
        TunableValue::I32(n) => serde_json::Value::from(n),
        TunableValue::F32(n) => serde_json::Value::from(f64::from(n)),
    }
}

/// Conversion JSON → TunableValue, pilotée par le kind attendu.
///
/// # Errors
/// `TypeMismatch` when the JSON value cannot carry the declared kind.
pub fn json_to_value(
    name: &str,
    kind_of: TunableValue,
    json: &serde_json::Value,
) -> Result<TunableValue, CoreError> {
    let mismatch = |got: &'static str| CoreError::TypeMismatch {
        name: name.to_string(),
        expected: kind_of.kind_name(),
        got,
    };
    match kind_of {
        TunableValue::Bool(_) => json
            .as_bool()
            .map(TunableValue::Bool)
            .ok_or_else(|| mismatch(json_kind(json))),
        TunableValue::U8(_) => json
            .as_u64()
            .filter(|&n| n <= 255)
            .map(|n| TunableValue::U8(n as u8))
            .ok_or_else(|| mismatch(json_kind(json))),
        TunableValue::I32(_) => json
            .as_i64()
            .filter(|&n| i32::try_from(n).is_ok())
            .map(|n| TunableValue::I32(n as i32))
            .ok_or_else(|| mismatch(json_kind(json))),
        TunableValue::F32(_) => json
            .as_f64()
            .map(|n| TunableValue::F32(n as f32))
            .ok_or_else(|| mismatch(json_kind(json))),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Un descripteur de paramètre avec sa valeur courante, tel que listé.
#[derive(Debug, Serialize)]
pub struct ParamInfo {
    /// Parameter name.
    pub name: &'static str,
    /// Kind name ("bool", "u8", "i32", "f32").
    pub kind: &'static str,
    /// Declared default.
    pub default: serde_json::Value,
    /// Lower bound, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    /// Upper bound, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Value>,
    /// UI step hint, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<serde_json::Value>,
    /// Grouping label.
    pub group: &'static str,
    /// Hidden behind the advanced fold.
    pub advanced: bool,
    /// Current value.
    pub value: serde_json::Value,
}

impl ParamInfo {
    /// Build from a descriptor and the current value.
    #[must_use]
    pub fn from_descriptor(d: &ParamDescriptor, current: Option<TunableValue>) -> Self {
        Self {
            name: d.name,
            kind: d.kind_name(),
            default: value_to_json(d.default),
            min: d.min.map(value_to_json),
            max: d.max.map(value_to_json),
            step: d.step.map(value_to_json),
            group: d.group,
            advanced: d.advanced,
            value: current.map_or(serde_json::Value::Null, value_to_json),
        }
    }
}

/// Un effet tel que listé par `GET /effects`.
#[derive(Debug, Serialize)]
pub struct EffectInfo {
    /// Effect id.
    pub id: u8,
    /// Effect name.
    pub name: &'static str,
    /// Family bucket name.
    pub family: &'static str,
    /// Tag bitset.
    pub tags: u32,
    /// Centre-origin flag.
    pub centre_origin: bool,
    /// Stateful (buffer feedback) flag.
    pub stateful: bool,
    /// LGP-sensitive flag.
    pub lgp_sensitive: bool,
    /// Selectable under the current active set.
    pub enabled: bool,
    /// Registered but suppressed by an override manifest.
    pub disabled_by_override: bool,
    /// Parameter descriptors with current values.
    pub parameters: Vec<ParamInfo>,
}

impl EffectInfo {
    /// Assemble from metadata and the plugin active-set flags.
    #[must_use]
    pub fn new(
        id: u8,
        meta: &'static EffectMeta,
        enabled: bool,
        disabled_by_override: bool,
        parameters: Vec<ParamInfo>,
    ) -> Self {
        Self {
            id,
            name: meta.name,
            family: meta.family.name(),
            tags: meta.tags,
            centre_origin: meta.centre_origin,
            stateful: meta.stateful,
            lgp_sensitive: meta.lgp_sensitive,
            enabled,
            disabled_by_override,
            parameters,
        }
    }
}

/// Une palette telle que listée par `GET /palettes`.
#[derive(Debug, Serialize)]
pub struct PaletteInfo {
    /// Palette id.
    pub id: u8,
    /// Palette name.
    pub name: &'static str,
    /// The 16 colour stops as `[r, g, b]` triples.
    pub entries: Vec<[u8; 3]>,
}

/// Spécification de transition côté requête.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TransitionDto {
    /// Cross-fade duration in milliseconds.
    pub duration_ms: u32,
    /// Easing curve index.
    #[serde(default)]
    pub curve_id: u8,
}

/// Corps de `POST /effects/current`.
#[derive(Debug, Deserialize)]
pub struct SetEffectBody {
    /// Target effect id.
    pub id: u8,
    /// Optional cross-fade.
    #[serde(default)]
    pub transition: Option<TransitionDto>,
}

/// `GET /system/stats` payload.
#[derive(Debug, Serialize)]
pub struct SystemStats {
    /// Rolling frames per second.
    pub fps: f64,
    /// Frames that overran the period.
    pub frame_drops: u64,
    /// Worst frame time over the window, µs.
    pub max_frame_us: u32,
    /// p95 frame time over the window, µs.
    pub p95_frame_us: u32,
    /// Free heap, bytes (0 when the platform exposes no probe).
    pub free_heap_bytes: u64,
    /// Hop index of the audio snapshot feeding the current frame.
    pub audio_hop_index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_kind_rejects_out_of_byte_numbers() {
        let err = json_to_value("p", TunableValue::U8(0), &serde_json::json!(300)).unwrap_err();
        assert_eq!(err.code(), "TypeMismatch");
        let ok = json_to_value("p", TunableValue::U8(0), &serde_json::json!(200)).unwrap();
        assert_eq!(ok, TunableValue::U8(200));
    }

    #[test]
    fn f32_kind_accepts_integers_too() {
        let ok = json_to_value("p", TunableValue::F32(0.0), &serde_json::json!(2)).unwrap();
        assert_eq!(ok, TunableValue::F32(2.0));
    }

    #[test]
    fn bool_kind_rejects_numbers() {
        let err = json_to_value("p", TunableValue::Bool(false), &serde_json::json!(1)).unwrap_err();
        assert_eq!(err.code(), "TypeMismatch");
    }
}
