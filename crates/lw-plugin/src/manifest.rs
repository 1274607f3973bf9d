use serde_json::Value;

use crate::error::ManifestError;

/// Merge behaviour declared by a manifest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManifestMode {
    /// The builtin set stays fully active; the manifest curates and
    /// documents.
    #[default]
    Additive,
    /// Only listed ids stay selectable; the rest is disabled by override.
    Override,
}

/// `plugin` block of a manifest.
#[derive(Clone, Debug, Default)]
pub struct PluginMeta {
    /// Plugin name, required, ≤ 64 bytes.
    pub name: String,
    /// Optional plugin version string.
    pub version: Option<String>,
    /// Optional author.
    pub author: Option<String>,
    /// Optional description.
    pub description: Option<String>,
}

/// One effect reference inside a manifest.
#[derive(Clone, Debug)]
pub struct EffectRef {
    /// Builtin effect id, validated to `0..128` and registered.
    pub id: u8,
    /// Optional display-name override.
    pub name: Option<String>,
}

/// The parsed, validated form of one `*.plugin.json` file.
#[derive(Clone, Debug)]
pub struct ParsedManifest {
    /// Schema version (1 lenient, 2 strict). Absent field ≡ 1.
    pub schema: u64,
    /// Optional manifest format version string.
    pub version: Option<String>,
    /// Plugin metadata.
    pub plugin: PluginMeta,
    /// Declared mode.
    pub mode: ManifestMode,
    /// Curated effects, non-empty.
    pub effects: Vec<EffectRef>,
}

/// Clés admises par niveau, pour la validation stricte du schema 2.
const TOP_KEYS: &[&str] = &["schema", "version", "plugin", "mode", "effects"];
const PLUGIN_KEYS: &[&str] = &["name", "version", "author", "description"];
const EFFECT_KEYS: &[&str] = &["id", "name"];

/// Parse and validate one manifest document.
///
/// `registered` is the boot-time bitmask of registered effect ids; every
/// referenced id must be inside `0..128` AND registered.
///
/// # Errors
/// The first validation failure, as a [`ManifestError`].
///
/// # Example
/// ```
/// use lw_plugin::manifest::parse_manifest;
/// let doc = r#"{ "schema": 2, "plugin": { "name": "night-set" },
///               "mode": "override", "effects": [ { "id": 0 } ] }"#;
/// let m = parse_manifest(doc, 0b1).unwrap();
/// assert_eq!(m.effects.len(), 1);
/// ```
pub fn parse_manifest(text: &str, registered: u128) -> Result<ParsedManifest, ManifestError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| ManifestError::Json(e.to_string()))?;
    let obj = root
        .as_object()
        .ok_or(ManifestError::BadFieldType("document"))?;

    let schema = match obj.get("schema") {
        None => 1,
        Some(v) => v.as_u64().ok_or(ManifestError::BadFieldType("schema"))?,
    };
    if !(1..=2).contains(&schema) {
        return Err(ManifestError::UnsupportedSchema(schema));
    }

    // Schema 2 rejects unknown keys at every nesting level.
    if schema >= 2 {
        check_keys(obj, TOP_KEYS, "")?;
        if let Some(plugin) = obj.get("plugin").and_then(Value::as_object) {
            check_keys(plugin, PLUGIN_KEYS, "plugin.")?;
        }
        if let Some(effects) = obj.get("effects").and_then(Value::as_array) {
            for e in effects {
                if let Some(e) = e.as_object() {
                    check_keys(e, EFFECT_KEYS, "effects[].")?;
                }
            }
        }
    }

    let plugin_obj = obj
        .get("plugin")
        .and_then(Value::as_object)
        .ok_or(ManifestError::MissingPluginName)?;
    let name = plugin_obj
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if name.is_empty() {
        return Err(ManifestError::MissingPluginName);
    }
    if name.len() > 64 {
        return Err(ManifestError::NameTooLong(name.len()));
    }

    let mode = match obj.get("mode") {
        None => ManifestMode::Additive,
        Some(v) => match v.as_str() {
            Some("additive") => ManifestMode::Additive,
            Some("override") => ManifestMode::Override,
            Some(other) => return Err(ManifestError::BadMode(other.to_string())),
            None => return Err(ManifestError::BadFieldType("mode")),
        },
    };

    let effects_val = obj
        .get("effects")
        .and_then(Value::as_array)
        .ok_or(ManifestError::EmptyEffects)?;
    if effects_val.is_empty() {
        return Err(ManifestError::EmptyEffects);
    }

    let mut effects = Vec::with_capacity(effects_val.len());
    for e in effects_val {
        let e = e.as_object().ok_or(ManifestError::BadFieldType("effects[]"))?;
        let raw_id = e
            .get("id")
            .and_then(Value::as_i64)
            .ok_or(ManifestError::BadFieldType("effects[].id"))?;
        if !(0..128).contains(&raw_id) {
            return Err(ManifestError::BadEffectId(raw_id));
        }
        let id = raw_id as u8;
        if registered & (1u128 << id) == 0 {
            return Err(ManifestError::UnknownEffectId(id));
        }
        effects.push(EffectRef {
            id,
            name: e.get("name").and_then(Value::as_str).map(String::from),
        });
    }

    Ok(ParsedManifest {
        schema,
        version: obj.get("version").and_then(Value::as_str).map(String::from),
        plugin: PluginMeta {
            name,
            version: plugin_obj
                .get("version")
                .and_then(Value::as_str)
                .map(String::from),
            author: plugin_obj
                .get("author")
                .and_then(Value::as_str)
                .map(String::from),
            description: plugin_obj
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
        },
        mode,
        effects,
    })
}

fn check_keys(
    obj: &serde_json::Map<String, Value>,
    allowed: &[&str],
    prefix: &str,
) -> Result<(), ManifestError> {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ManifestError::UnknownKey(format!("{prefix}{key}")));
        }
    }
    Ok(())
}

/// Re-emit the normalised form of a manifest (stable key order, defaults
/// made explicit). Parsing the output yields a semantically equal result.
#[must_use]
pub fn normalise(m: &ParsedManifest) -> String {
    let effects: Vec<Value> = m
        .effects
        .iter()
        .map(|e| {
            let mut o = serde_json::Map::new();
            o.insert("id".into(), Value::from(e.id));
            if let Some(name) = &e.name {
                o.insert("name".into(), Value::from(name.clone()));
            }
            Value::Object(o)
        })
        .collect();

    let mut plugin = serde_json::Map::new();
    plugin.insert("name".into(), Value::from(m.plugin.name.clone()));
    if let Some(v) = &m.plugin.version {
        plugin.insert("version".into(), Value::from(v.clone()));
    }
    if let Some(v) = &m.plugin.author {
        plugin.insert("author".into(), Value::from(v.clone()));
    }
    if let Some(v) = &m.plugin.description {
        plugin.insert("description".into(), Value::from(v.clone()));
    }

    let mut root = serde_json::Map::new();
    root.insert("schema".into(), Value::from(m.schema));
    if let Some(v) = &m.version {
        root.insert("version".into(), Value::from(v.clone()));
    }
    root.insert("plugin".into(), Value::Object(plugin));
    root.insert(
        "mode".into(),
        Value::from(match m.mode {
            ManifestMode::Additive => "additive",
            ManifestMode::Override => "override",
        }),
    );
    root.insert("effects".into(), Value::Array(effects));
    Value::Object(root).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: u128 = u128::MAX;

    #[test]
    fn minimal_schema1_manifest_parses() {
        let m = parse_manifest(
            r#"{ "plugin": { "name": "p" }, "effects": [ { "id": 3 } ] }"#,
            ALL,
        )
        .unwrap();
        assert_eq!(m.schema, 1);
        assert_eq!(m.mode, ManifestMode::Additive);
        assert_eq!(m.effects[0].id, 3);
    }

    #[test]
    fn empty_effects_is_rejected() {
        let err = parse_manifest(r#"{ "plugin": { "name": "p" }, "effects": [] }"#, ALL)
            .unwrap_err();
        assert_eq!(err.detail(), "EmptyEffects");
    }

    #[test]
    fn unknown_key_rejected_by_schema2_accepted_by_schema1() {
        let doc = |schema: u32| {
            format!(
                r#"{{ "schema": {schema}, "plugin": {{ "name": "p", "color": "red" }},
                      "effects": [ {{ "id": 0 }} ] }}"#
            )
        };
        let err = parse_manifest(&doc(2), ALL).unwrap_err();
        assert_eq!(err.detail(), "UnknownKey");
        assert!(matches!(err, ManifestError::UnknownKey(k) if k == "plugin.color"));
        assert!(parse_manifest(&doc(1), ALL).is_ok());
    }

    #[test]
    fn nested_unknown_key_in_effects_rejected() {
        let doc = r#"{ "schema": 2, "plugin": { "name": "p" },
                       "effects": [ { "id": 0, "speed": 3 } ] }"#;
        let err = parse_manifest(doc, ALL).unwrap_err();
        assert_eq!(err.detail(), "UnknownKey");
    }

    #[test]
    fn effect_id_128_is_out_of_range() {
        let err = parse_manifest(
            r#"{ "plugin": { "name": "p" }, "effects": [ { "id": 128 } ] }"#,
            ALL,
        )
        .unwrap_err();
        assert_eq!(err.detail(), "BadEffectId");
    }

    #[test]
    fn unregistered_effect_id_is_rejected() {
        let err = parse_manifest(
            r#"{ "plugin": { "name": "p" }, "effects": [ { "id": 5 } ] }"#,
            0b1111, // only ids 0..4 registered
        )
        .unwrap_err();
        assert_eq!(err.detail(), "UnknownEffectId");
    }

    #[test]
    fn plugin_name_over_64_bytes_is_rejected() {
        let long = "x".repeat(65);
        let err = parse_manifest(
            &format!(r#"{{ "plugin": {{ "name": "{long}" }}, "effects": [ {{ "id": 0 }} ] }}"#),
            ALL,
        )
        .unwrap_err();
        assert_eq!(err.detail(), "NameTooLong");
    }

    #[test]
    fn normalise_roundtrips_semantically() {
        let doc = r#"{ "schema": 2, "version": "1.0",
                       "plugin": { "name": "p", "author": "a" },
                       "mode": "override",
                       "effects": [ { "id": 2, "name": "deux" }, { "id": 0 } ] }"#;
        let first = parse_manifest(doc, ALL).unwrap();
        let second = parse_manifest(&normalise(&first), ALL).unwrap();
        assert_eq!(first.schema, second.schema);
        assert_eq!(first.mode, second.mode);
        assert_eq!(first.plugin.name, second.plugin.name);
        assert_eq!(first.plugin.author, second.plugin.author);
        assert_eq!(first.effects.len(), second.effects.len());
        for (a, b) in first.effects.iter().zip(&second.effects) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
        }
    }
}
