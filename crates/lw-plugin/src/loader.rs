use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use arc_swap::ArcSwap;

use crate::error::ManifestError;
use crate::manifest::{ManifestMode, ParsedManifest, parse_manifest};

/// Statistiques du dernier rechargement réussi.
#[derive(Clone, Copy, Debug)]
pub struct ReloadStats {
    /// When the set was swapped in.
    pub timestamp: SystemTime,
    /// Whether the last reload attempt succeeded.
    pub ok: bool,
    /// Manifests in the active set.
    pub manifest_count: usize,
    /// Errors in the last attempt (0 on success).
    pub error_count: usize,
}

/// L'ensemble actif : le masque des ids sélectionnables et le mode qui
/// l'a produit. Swappé atomiquement, jamais muté en place.
#[derive(Clone, Debug)]
pub struct ActiveSet {
    /// Effective mode (override iff any manifest declared it).
    pub mode: ManifestMode,
    /// Bitmask of selectable ids.
    pub enabled: u128,
    /// Bitmask of boot-registered ids.
    pub registered: u128,
    /// Stats of the reload that produced this set.
    pub stats: ReloadStats,
}

impl ActiveSet {
    /// Whether the scheduler may select this id.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, id: u8) -> bool {
        id < 128 && self.enabled & (1u128 << id) != 0
    }

    /// Registered but suppressed by an override manifest. Still resident
    /// and introspectable — only selection is refused.
    #[inline]
    #[must_use]
    pub fn disabled_by_override(&self, id: u8) -> bool {
        id < 128 && self.registered & (1u128 << id) != 0 && !self.is_enabled(id)
    }

    /// Number of selectable ids.
    #[must_use]
    pub fn enabled_count(&self) -> u32 {
        self.enabled.count_ones()
    }
}

/// Per-file outcome of the last reload attempt. Operators get the whole
/// picture, not just the first failure.
#[derive(Clone, Debug)]
pub struct FileStatus {
    /// Manifest path.
    pub path: PathBuf,
    /// Plugin name when parsing got that far.
    pub plugin_name: Option<String>,
    /// Validation failure, `None` when the file is valid.
    pub error: Option<ManifestError>,
}

/// Outcome of one reload attempt.
#[derive(Clone, Debug)]
pub struct ReloadReport {
    /// All-or-nothing success flag.
    pub ok: bool,
    /// Every scanned file's status.
    pub files: Vec<FileStatus>,
}

/// Le gestionnaire de plugins : source d'autorité de l'ensemble actif.
///
/// Le renderer et l'API lisent l'`ActiveSet` via un load acquire ; le
/// rechargement construit le nouvel ensemble à côté puis le swappe en un
/// point. Entre deux rechargements, aucun lecteur n'observe d'état
/// partiel.
///
/// # Example
/// ```
/// use lw_plugin::loader::PluginManager;
/// let dir = std::env::temp_dir().join("lw-plugin-doc");
/// std::fs::create_dir_all(&dir).ok();
/// let manager = PluginManager::new(dir, 0b111);
/// let report = manager.reload();
/// assert!(report.ok); // no manifests: full builtin set stays active
/// assert!(manager.active().is_enabled(2));
/// ```
pub struct PluginManager {
    dir: PathBuf,
    registered: u128,
    active: ArcSwap<ActiveSet>,
    last_report: Mutex<ReloadReport>,
}

impl PluginManager {
    /// Build for a plugin directory and the boot-time registered-id mask.
    /// The initial active set is the full builtin set (additive).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, registered: u128) -> Self {
        Self {
            dir: dir.into(),
            registered,
            active: ArcSwap::from_pointee(ActiveSet {
                mode: ManifestMode::Additive,
                enabled: registered,
                registered,
                stats: ReloadStats {
                    timestamp: SystemTime::now(),
                    ok: true,
                    manifest_count: 0,
                    error_count: 0,
                },
            }),
            last_report: Mutex::new(ReloadReport {
                ok: true,
                files: Vec::new(),
            }),
        }
    }

    /// The current active set (acquire load, wait-free).
    #[must_use]
    pub fn active(&self) -> Arc<ActiveSet> {
        self.active.load_full()
    }

    /// Per-file statuses from the last reload attempt.
    #[must_use]
    pub fn last_report(&self) -> ReloadReport {
        match self.last_report.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Scan, parse and validate every `*.plugin.json`, then atomically
    /// swap the active set — or leave it untouched if anything failed.
    pub fn reload(&self) -> ReloadReport {
        let paths = self.scan();
        let mut files = Vec::with_capacity(paths.len());
        let mut manifests: Vec<ParsedManifest> = Vec::with_capacity(paths.len());
        let mut failed = false;

        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(text) => match parse_manifest(&text, self.registered) {
                    Ok(m) => {
                        files.push(FileStatus {
                            path,
                            plugin_name: Some(m.plugin.name.clone()),
                            error: None,
                        });
                        manifests.push(m);
                    }
                    Err(e) => {
                        failed = true;
                        files.push(FileStatus {
                            path,
                            plugin_name: None,
                            error: Some(e),
                        });
                    }
                },
                Err(e) => {
                    failed = true;
                    files.push(FileStatus {
                        path,
                        plugin_name: None,
                        error: Some(ManifestError::Json(e.to_string())),
                    });
                }
            }
        }

        let error_count = files.iter().filter(|f| f.error.is_some()).count();
        let report = ReloadReport {
            ok: !failed,
            files,
        };

        if failed {
            // All-or-nothing: previous set and mask stay untouched.
            log::warn!(
                "plugin reload aborted: {error_count} invalid manifest(s), active set unchanged"
            );
        } else {
            let mode = if manifests.iter().any(|m| m.mode == ManifestMode::Override) {
                ManifestMode::Override
            } else {
                ManifestMode::Additive
            };
            let enabled = match mode {
                ManifestMode::Additive => self.registered,
                ManifestMode::Override => {
                    let mut mask = 0u128;
                    for m in &manifests {
                        for e in &m.effects {
                            mask |= 1u128 << e.id;
                        }
                    }
                    mask & self.registered
                }
            };
            let set = ActiveSet {
                mode,
                enabled,
                registered: self.registered,
                stats: ReloadStats {
                    timestamp: SystemTime::now(),
                    ok: true,
                    manifest_count: manifests.len(),
                    error_count: 0,
                },
            };
            log::info!(
                "plugin reload ok: {} manifest(s), {} effect(s) enabled ({:?})",
                manifests.len(),
                set.enabled_count(),
                mode
            );
            self.active.store(Arc::new(set));
        }

        match self.last_report.lock() {
            Ok(mut g) => *g = report.clone(),
            Err(poisoned) => *poisoned.into_inner() = report.clone(),
        }
        report
    }

    /// Plugin directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            // Missing directory is a valid empty set, not an error.
            return paths;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".plugin.json"))
            {
                paths.push(path);
            }
        }
        paths.sort(); // deterministic order for reports and merging
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const REGISTERED: u128 = (1 << 11) - 1; // ids 0..10

    fn write_manifest(dir: &Path, file: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn no_manifests_keeps_full_builtin_set() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PluginManager::new(dir.path(), REGISTERED);
        let report = manager.reload();
        assert!(report.ok);
        let set = manager.active();
        assert_eq!(set.enabled, REGISTERED);
        assert_eq!(set.mode, ManifestMode::Additive);
    }

    #[test]
    fn one_invalid_manifest_aborts_the_whole_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "a.plugin.json",
            r#"{ "mode": "override", "plugin": { "name": "A" },
                 "effects": [ { "id": 0 }, { "id": 1 }, { "id": 2 } ] }"#,
        );
        write_manifest(
            dir.path(),
            "b.plugin.json",
            r#"{ "plugin": { "name": "B" }, "effects": [] }"#,
        );

        let manager = PluginManager::new(dir.path(), REGISTERED);
        let report = manager.reload();
        assert!(!report.ok);
        // The report names the failing file with its detail code.
        let b = report
            .files
            .iter()
            .find(|f| f.path.ends_with("b.plugin.json"))
            .unwrap();
        assert_eq!(b.error.as_ref().map(ManifestError::detail), Some("EmptyEffects"));
        // Active set untouched: still the full builtin set.
        assert_eq!(manager.active().enabled, REGISTERED);

        // Remove the invalid file: the override now lands atomically.
        std::fs::remove_file(dir.path().join("b.plugin.json")).unwrap();
        let report = manager.reload();
        assert!(report.ok);
        let set = manager.active();
        assert_eq!(set.enabled, 0b111);
        assert!(set.is_enabled(1));
        assert!(set.disabled_by_override(5));
        assert!(!set.disabled_by_override(1));
    }

    #[test]
    fn reload_same_override_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "s.plugin.json",
            r#"{ "mode": "override", "plugin": { "name": "S" },
                 "effects": [ { "id": 4 }, { "id": 7 } ] }"#,
        );
        let manager = PluginManager::new(dir.path(), REGISTERED);
        manager.reload();
        let first = manager.active().enabled;
        manager.reload();
        assert_eq!(manager.active().enabled, first);
        assert_eq!(first, (1 << 4) | (1 << 7));
    }

    #[test]
    fn additive_then_empty_dir_returns_to_full_set() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "doc.plugin.json",
            r#"{ "plugin": { "name": "doc" }, "effects": [ { "id": 0 } ] }"#,
        );
        let manager = PluginManager::new(dir.path(), REGISTERED);
        manager.reload();
        assert_eq!(manager.active().enabled, REGISTERED); // additive adds nothing

        std::fs::remove_file(dir.path().join("doc.plugin.json")).unwrap();
        manager.reload();
        assert_eq!(manager.active().enabled, REGISTERED);
    }

    #[test]
    fn override_switch_is_atomic_per_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "s.plugin.json",
            r#"{ "mode": "override", "plugin": { "name": "S" },
                 "effects": [ { "id": 1 } ] }"#,
        );
        let manager = PluginManager::new(dir.path(), REGISTERED);
        manager.reload();
        assert_eq!(manager.active().enabled, 0b10);

        write_manifest(
            dir.path(),
            "s.plugin.json",
            r#"{ "mode": "override", "plugin": { "name": "S" },
                 "effects": [ { "id": 2 }, { "id": 3 } ] }"#,
        );
        manager.reload();
        assert_eq!(manager.active().enabled, 0b1100);
    }
}
