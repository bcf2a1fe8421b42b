//! # kin-config
//!
//! Layered configuration loading for Kin using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`KIN_*` prefix, `__` as separator)
//! 2. Project-level `.kin/config.toml`
//! 3. User-level `~/.config/kin/config.toml`
//! 4. Built-in defaults
//!
//! `KIN_DATABASE__PATH` maps to `database.path`, `KIN_UNDO__DELETE_WINDOW_DAYS`
//! to `undo.delete_window_days`, and so on.
//!
//! # Usage
//!
//! ```no_run
//! use kin_config::KinConfig;
//!
//! let config = KinConfig::load_with_dotenv().expect("config");
//! println!("database: {}", config.database.path);
//! ```

mod database;
mod error;
mod undo;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use undo::UndoConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project-local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = ".kin/config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KinConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub undo: UndoConfig,
}

impl KinConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`KinConfig::load_with_dotenv`] for `.env`
    /// support. The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed, or a
    /// validation error from [`KinConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`KinConfig::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        // A missing .env is fine.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer more providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("KIN_").split("__"))
    }

    /// Path to the user-global config file.
    #[must_use]
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kin").join("config.toml"))
    }

    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.undo.validate()
    }
}
