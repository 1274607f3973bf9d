use std::path::Path;

use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};

/// Lance un watcher sur le répertoire des plugins : toute création,
/// modification ou suppression d'un `*.plugin.json` pousse une demande de
/// rechargement vers la tâche housekeeping.
///
/// Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot
/// be watched.
pub fn spawn_plugin_watcher(
    plugin_dir: &Path,
    reload_tx: flume::Sender<()>,
) -> Result<impl Watcher + use<>> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let relevant = matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) && event.paths.iter().any(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".plugin.json"))
            });
            if relevant {
                // Coalesced by the bounded channel; housekeeping reloads once.
                let _ = reload_tx.try_send(());
            }
        }
    })?;

    watcher.watch(plugin_dir, RecursiveMode::NonRecursive)?;
    log::info!("watching {} for manifest changes", plugin_dir.display());
    Ok(watcher)
}
