use std::path::PathBuf;

use clap::Parser;

/// Host-side runner for the LightwaveOS core: real render and audio
/// pipelines, simulated LED driver.
#[derive(Parser, Debug)]
#[command(name = "lightwave", version, about)]
pub struct Cli {
    /// Boot configuration TOML (missing file = built-in defaults).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Plugin manifest directory (overrides the config).
    #[arg(long)]
    pub plugin_dir: Option<PathBuf>,

    /// Tunable persistence file (overrides the config).
    #[arg(long)]
    pub tunables: Option<PathBuf>,

    /// Audio source: "silence", "tone:<hz>", or "mic" (capture feature).
    #[arg(long, default_value = "silence")]
    pub audio: String,

    /// Target fps (overrides the config).
    #[arg(long)]
    pub fps: Option<u32>,
}
