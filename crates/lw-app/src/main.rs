/// Point d'entrée host-side : CLI, config de boot, bring-up des tâches.

mod boot;
mod cli;
mod hotreload;

use anyhow::Result;
use clap::Parser;
use lw_core::config::EngineConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();

    let config = match &cli.config {
        Some(path) => lw_core::config::load_config(path)?,
        None => {
            let default_path = std::path::Path::new("config/engine.toml");
            if default_path.exists() {
                lw_core::config::load_config(default_path)?
            } else {
                EngineConfig::default()
            }
        }
    };

    log::info!(
        "lightwave core starting: {} fps, audio {}, plugins in '{}'",
        cli.fps.unwrap_or(config.target_fps),
        cli.audio,
        cli.plugin_dir
            .as_ref()
            .map_or_else(|| config.plugin_dir.clone(), |p| p.display().to_string()),
    );

    boot::run(&cli, &config)
}
