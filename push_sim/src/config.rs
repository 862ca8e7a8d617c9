//! Simulation configuration loaded from TOML.
//!
//! Every section and field is optional; anything left out falls back to
//! the built-in defaults.
//!
//! ```toml
//! [world]
//! width = 12.0
//! height = 8.0
//! robot_boundary_inset = 1.5
//!
//! [robot]
//! charge = 40.0
//! input_efficiency = 0.2
//! depletion = "drift"
//!
//! [robot.policy]
//! kind = "phototaxis"
//! cruise_speed = 0.4
//!
//! [run]
//! steps = 1200
//! dt = 0.05
//! ```

use push_core::{PolicyKind, RobotParams, WorldConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Defaults applied to every robot a scenario creates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    #[serde(flatten)]
    pub params: RobotParams,

    pub policy: PolicyKind,
}

/// Run length and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// World steps per scenario run
    pub steps: u64,

    /// Timestep in seconds
    pub dt: f64,

    /// World steps per frame
    pub skip: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: 600,
            dt: 0.1,
            skip: 1,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub robot: RobotConfig,
    pub run: RunConfig,
}

impl SimConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
