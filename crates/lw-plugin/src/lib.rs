/// Manifests de plugin et rechargement atomique.
///
/// Les plugins n'apportent aucun code : un manifest `*.plugin.json` cure
/// et documente l'ensemble builtin (mode additif) ou le restreint en
/// allowlist (mode override). Le rechargement est tout-ou-rien — un seul
/// manifest invalide et l'ensemble actif précédent reste en place.

pub mod error;
pub mod loader;
pub mod manifest;

pub use error::ManifestError;
pub use loader::{ActiveSet, FileStatus, PluginManager, ReloadReport, ReloadStats};
pub use manifest::{EffectRef, ManifestMode, ParsedManifest, PluginMeta};
