use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration de boot, chargée une fois avant la mise en route.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine ;
/// les réglages runtime vivent dans le Tunable Store, pas ici.
///
/// # Example
/// ```
/// use lw_core::config::EngineConfig;
/// let config = EngineConfig::default();
/// assert_eq!(config.target_fps, 120);
/// assert!(config.audio_enabled);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    // === Rendu ===
    /// FPS cible du scheduler (120 nominal).
    pub target_fps: u32,
    /// Luminosité globale initiale [0, 255].
    pub brightness: u8,
    /// Effet sélectionné au boot.
    pub boot_effect_id: u8,
    /// Palette sélectionnée au boot.
    pub boot_palette_id: u8,

    // === Feature gates ===
    /// Pipeline audio actif (sinon le snapshot reste silencieux).
    pub audio_enabled: bool,
    /// Correction couleur appliquée à la copie de sortie.
    pub correction_enabled: bool,
    /// Publication du flux LED vers les abonnés externes.
    pub stream_enabled: bool,

    // === Chemins ===
    /// Répertoire des manifests `*.plugin.json`.
    pub plugin_dir: String,
    /// Fichier de persistance du tunable store (vide = volatile).
    pub tunable_path: String,

    // === Audio ===
    /// Sample rate du pipeline d'analyse.
    pub sample_rate: u32,
    /// Taille de la fenêtre d'analyse en échantillons.
    pub window_size: usize,
    /// Hop en échantillons entre deux analyses légères.
    pub hop_size: usize,
    /// Un hop lourd (Goertzel complet) tous les N hops.
    pub heavy_every: u32,

    // === Stream ===
    /// Intervalle minimal entre deux frames de stream (ms).
    pub stream_min_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 120,
            brightness: 200,
            boot_effect_id: 0,
            boot_palette_id: 0,
            audio_enabled: true,
            correction_enabled: true,
            stream_enabled: true,
            plugin_dir: "plugins".to_string(),
            tunable_path: String::new(),
            sample_rate: 12_800,
            window_size: 1500,
            hop_size: 128,
            heavy_every: 10,
            stream_min_interval_ms: 50,
        }
    }
}

/// Structure TOML intermédiaire : tous les champs optionnels, pour que les
/// fichiers partiels fusionnent avec les défauts.
#[derive(Deserialize)]
struct ConfigFile {
    engine: Option<EngineSection>,
    audio: Option<AudioSection>,
    stream: Option<StreamSection>,
}

#[derive(Deserialize)]
struct EngineSection {
    target_fps: Option<u32>,
    brightness: Option<u8>,
    boot_effect_id: Option<u8>,
    boot_palette_id: Option<u8>,
    audio_enabled: Option<bool>,
    correction_enabled: Option<bool>,
    stream_enabled: Option<bool>,
    plugin_dir: Option<String>,
    tunable_path: Option<String>,
}

#[derive(Deserialize)]
struct AudioSection {
    sample_rate: Option<u32>,
    window_size: Option<usize>,
    hop_size: Option<usize>,
    heavy_every: Option<u32>,
}

#[derive(Deserialize)]
struct StreamSection {
    min_interval_ms: Option<u64>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use lw_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/engine.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("impossible de lire {}", path.display()))?;

    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("erreur de parsing TOML dans {}", path.display()))?;

    let mut config = EngineConfig::default();

    if let Some(e) = file.engine {
        if let Some(v) = e.target_fps {
            config.target_fps = v;
        }
        if let Some(v) = e.brightness {
            config.brightness = v;
        }
        if let Some(v) = e.boot_effect_id {
            config.boot_effect_id = v;
        }
        if let Some(v) = e.boot_palette_id {
            config.boot_palette_id = v;
        }
        if let Some(v) = e.audio_enabled {
            config.audio_enabled = v;
        }
        if let Some(v) = e.correction_enabled {
            config.correction_enabled = v;
        }
        if let Some(v) = e.stream_enabled {
            config.stream_enabled = v;
        }
        if let Some(v) = e.plugin_dir {
            config.plugin_dir = v;
        }
        if let Some(v) = e.tunable_path {
            config.tunable_path = v;
        }
    }

    if let Some(a) = file.audio {
        if let Some(v) = a.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = a.window_size {
            config.window_size = v;
        }
        if let Some(v) = a.hop_size {
            config.hop_size = v;
        }
        if let Some(v) = a.heavy_every {
            config.heavy_every = v;
        }
    }

    if let Some(s) = file.stream
        && let Some(v) = s.min_interval_ms
    {
        config.stream_min_interval_ms = v;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_merges_over_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[engine]\ntarget_fps = 60\n\n[audio]\nheavy_every = 5").unwrap();
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.heavy_every, 5);
        // Untouched fields keep their defaults.
        assert_eq!(config.sample_rate, 12_800);
        assert_eq!(config.brightness, 200);
    }
}
