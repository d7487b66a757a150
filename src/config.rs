//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. The file is named by the `SNAKE_ENGINE_CONFIG` variable.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::level::{CatalogError, LevelCatalog};
use crate::game::reward::RewardConfig;
use crate::game::tick::GameConfig;
use crate::runtime::scheduler::SchedulerConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SNAKE_ENGINE_CONFIG";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured level catalog is unusable.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A setting is out of range.
    #[error("Invalid config value {field}: {reason}")]
    Invalid {
        /// Offending setting
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Highest render rate with a non-zero frame period.
pub const MAX_RENDER_FPS: u32 = 1000;

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation rules
    pub game: GameConfig,
    /// Reward tuning
    pub rewards: RewardConfig,
    /// Timer settings
    pub scheduler: SchedulerConfig,
    /// JSON level catalog replacing the built-in one
    pub catalog_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Parse from JSON text and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall or panic a timer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let speed = &self.game.speed;
        if speed.min_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "game.speed.min_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if speed.base_interval_ms < speed.min_interval_ms {
            return Err(ConfigError::Invalid {
                field: "game.speed.base_interval_ms",
                reason: format!("{} is below the {}ms floor", speed.base_interval_ms, speed.min_interval_ms),
            });
        }
        if !(1..=MAX_RENDER_FPS).contains(&self.scheduler.render_fps) {
            return Err(ConfigError::Invalid {
                field: "scheduler.render_fps",
                reason: format!("{} is outside 1..={}", self.scheduler.render_fps, MAX_RENDER_FPS),
            });
        }
        Ok(())
    }

    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from the file named by `SNAKE_ENGINE_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                tracing::info!("Loading config from {:?}", path);
                Self::from_json_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Level catalog to play: the configured file, or the built-in table.
    pub fn load_catalog(&self) -> Result<LevelCatalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => Ok(LevelCatalog::load(path)?),
            None => Ok(LevelCatalog::builtin()),
        }
    }
}
