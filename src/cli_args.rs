//! All the CLI arguments for Constellation

/// The name of the main config file in the config directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "constellation.toml";

/// An ambient particle field for your terminal
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about)]
#[non_exhaustive]
pub struct CliArgs {
    /// Use a config directory other than the default.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,

    /// Override the log level from the config file.
    #[arg(long)]
    pub log_level: Option<crate::config::LogLevel>,

    /// Override the log file path from the config file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// Override the target frame rate from the config file.
    #[arg(short, long)]
    pub frame_rate: Option<u32>,

    /// Show a small overlay with the particle count and render FPS.
    #[arg(long)]
    pub stats: bool,
}
