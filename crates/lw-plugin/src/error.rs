use thiserror::Error;

/// Validation failures for one manifest file.
///
/// [`ManifestError::detail`] is the stable sub-code surfaced inside the
/// wire-level `InvalidManifest` error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifestError {
    /// The file is not valid JSON.
    #[error("JSON invalide : {0}")]
    Json(String),

    /// The `schema` field names an unknown version.
    #[error("schema {0} non reconnu")]
    UnsupportedSchema(u64),

    /// `plugin.name` is missing or empty.
    #[error("plugin.name manquant ou vide")]
    MissingPluginName,

    /// `plugin.name` exceeds 64 bytes.
    #[error("plugin.name trop long ({0} octets, max 64)")]
    NameTooLong(usize),

    /// `effects` is missing or empty.
    #[error("liste d'effets vide")]
    EmptyEffects,

    /// Schema 2: a key outside the schema, at any nesting level.
    #[error("clé inconnue : {0}")]
    UnknownKey(String),

    /// An effect id outside `0..128`.
    #[error("id d'effet hors plage : {0}")]
    BadEffectId(i64),

    /// An effect id inside the range but not registered at boot.
    #[error("id d'effet non enregistré : {0}")]
    UnknownEffectId(u8),

    /// `mode` is neither "additive" nor "override".
    #[error("mode invalide : {0}")]
    BadMode(String),

    /// A structural field has the wrong JSON type.
    #[error("champ '{0}' du mauvais type")]
    BadFieldType(&'static str),
}

impl ManifestError {
    /// Stable detail code, e.g. `EmptyEffects`, `UnknownKey`.
    #[must_use]
    pub fn detail(&self) -> &'static str {
        match self {
            ManifestError::Json(_) => "Json",
            ManifestError::UnsupportedSchema(_) => "UnsupportedSchema",
            ManifestError::MissingPluginName => "MissingPluginName",
            ManifestError::NameTooLong(_) => "NameTooLong",
            ManifestError::EmptyEffects => "EmptyEffects",
            ManifestError::UnknownKey(_) => "UnknownKey",
            ManifestError::BadEffectId(_) => "BadEffectId",
            ManifestError::UnknownEffectId(_) => "UnknownEffectId",
            ManifestError::BadMode(_) => "BadMode",
            ManifestError::BadFieldType(_) => "BadFieldType",
        }
    }
}

impl From<ManifestError> for lw_core::CoreError {
    fn from(e: ManifestError) -> Self {
        lw_core::CoreError::InvalidManifest(format!("{}: {e}", e.detail()))
    }
}
