//! All of the user config for Constellation.

use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start Constellation.
static DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Target frame rate
    pub frame_rate: u32,
    /// The base hue that particles and their links are drawn in.
    pub color: Color,
    /// The particle field itself.
    pub field: Field,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory.join("constellation").join("constellation.log");

        Self {
            log_level: LogLevel::Off,
            log_path,
            frame_rate: 30,
            color: Color::default(),
            field: Field::default(),
        }
    }
}

/// The base colour for the whole render.
#[derive(serde::Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct Color {
    /// Red
    pub red: u8,
    /// Green
    pub green: u8,
    /// Blue
    pub blue: u8,
}

impl Default for Color {
    fn default() -> Self {
        // Indigo
        Self {
            red: 99,
            green: 102,
            blue: 241,
        }
    }
}

impl Color {
    /// Convert to the renderer's float representation.
    #[must_use]
    pub fn as_colour(&self) -> crate::surface::Colour {
        (
            f32::from(self.red) / 255.0,
            f32::from(self.green) / 255.0,
            f32::from(self.blue) / 255.0,
            1.0,
        )
    }
}

/// All the variables that can be configured for the particle field.
#[derive(serde::Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct Field {
    /// The hard ceiling on the number of particles, however wide the terminal is.
    pub max_particles: usize,
    /// One particle is created for every this-many columns of terminal width.
    pub columns_per_particle: usize,
    /// Particles closer than this get a connecting line drawn between them.
    pub link_distance: f32,
    /// The opacity of a connecting line between two touching particles. Fades to zero as the
    /// particles approach `link_distance`.
    pub link_opacity: f32,
    /// Particles within this distance of the pointer get nudged away from it.
    pub pointer_radius: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            max_particles: 100,
            columns_per_particle: 15,
            link_distance: 120.0,
            link_opacity: 0.2,
            pointer_radius: 150.0,
        }
    }
}

impl Config {
    /// Canonical path to the config directory.
    pub async fn directory(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        state.config_path.read().await.clone()
    }

    /// Get the stable location of Constellation's config directory on the user's system.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join("constellation"))
    }

    /// Figure out where our config is being stored, and create the directory if needed.
    pub async fn setup_directory(
        maybe_custom_path: Option<std::path::PathBuf>,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<()> {
        let path = match maybe_custom_path {
            None => Self::default_directory()?,
            Some(path_string) => std::path::PathBuf::new().join(path_string),
        };

        std::fs::create_dir_all(path.clone())?;
        *state.config_path.write().await = path;

        Ok(())
    }

    /// Canonical path to the main config file.
    pub async fn main_config_path(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        Self::directory(state)
            .await
            .join(crate::cli_args::DEFAULT_CONFIG_FILE_NAME)
    }

    /// Load the main config, copying the shipped defaults into place on first run.
    pub async fn load(state: &std::sync::Arc<crate::shared_state::SharedState>) -> Result<Self> {
        let config_path = Self::main_config_path(state).await;
        if !config_path.exists() {
            std::fs::write(config_path.clone(), DEFAULT_CONFIG)?;
        }

        tracing::info!("Loading the main Constellation config from: {config_path:?}");
        let result = std::fs::read_to_string(config_path.clone());
        match result {
            Ok(data) => {
                tracing::trace!("Using config file:\n{data}");
                Ok(toml::from_str::<Self>(&data)?)
            }
            Err(err) => {
                tracing::error!("Loading config: {err:?}");
                color_eyre::eyre::bail!(
                    "Couldn't load config at {config_path:?}: {}",
                    err.to_string()
                );
            }
        }
    }

    /// Load the main config into the shared state.
    pub async fn load_config_into_shared_state(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<Self> {
        let mut config_state = state.config.write().await;
        let new_config = Self::load(state).await?;
        *config_state = new_config.clone();
        drop(config_state);

        Ok(new_config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shipped_defaults_parse() {
        let config = toml::from_str::<Config>(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.field.max_particles, 100);
        assert_eq!(config.field.columns_per_particle, 15);
        assert!((config.field.link_distance - 120.0).abs() < f32::EPSILON);
        assert!((config.field.pointer_radius - 150.0).abs() < f32::EPSILON);
    }

    #[test]
    fn base_colour_is_indigo() {
        let (red, green, blue, alpha) = Color::default().as_colour();
        assert!((red - 99.0 / 255.0).abs() < f32::EPSILON);
        assert!((green - 102.0 / 255.0).abs() < f32::EPSILON);
        assert!((blue - 241.0 / 255.0).abs() < f32::EPSILON);
        assert!((alpha - 1.0).abs() < f32::EPSILON);
    }
}
