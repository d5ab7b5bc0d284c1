//! Configuration file support for the trainer.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/trainer/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MIN_TICK_INTERVAL_MS: u64 = 1;
pub const MAX_TICK_INTERVAL_MS: u64 = 1000;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub library: LibraryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Host-side engine driving
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Period of the host's tick, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Preset library location
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LibraryConfig {
    /// Defaults to `<data_dir>/presets.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets_path: Option<PathBuf>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("trainer")
}

fn default_tick_interval_ms() -> u64 {
    250
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("trainer").join("config.toml")
    }

    /// Reject values the engine host cannot honour
    pub fn validate(&self) -> Result<()> {
        let tick = self.engine.tick_interval_ms;
        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&tick) {
            return Err(Error::Config(format!(
                "engine.tick_interval_ms must be between {} and {} (got {})",
                MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS, tick
            )));
        }
        if self.data.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("data.data_dir must not be empty".into()));
        }
        Ok(())
    }

    /// Where presets are read from
    pub fn presets_path(&self) -> PathBuf {
        self.library
            .presets_path
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("presets.json"))
    }

    /// Directory holding persisted engine and stopwatch records
    pub fn state_dir(&self) -> PathBuf {
        self.data.data_dir.join("state")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
