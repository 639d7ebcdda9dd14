//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STASH_*)
//! 2. TOML config file (if STASH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Location value that selects an ephemeral, non-persistent store.
pub const IN_MEMORY: &str = ":memory:";

/// Backend names accepted by [`CacheConfig::backend`].
pub const BACKEND_SQLITE: &str = "sqlite";
pub const BACKEND_MEMORY: &str = "memory";

/// Cache configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STASH_*)
/// 2. TOML config file (if STASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path to the SQLite cache database, or `:memory:`.
    ///
    /// Set via STASH_DATABASE environment variable.
    /// Required by the sqlite backend.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// 1-in-N probability of sweeping expired rows on each write.
    ///
    /// Set via STASH_AUTOMATIC_CLEANING_FACTOR. 0 disables the sweep.
    #[serde(default)]
    pub automatic_cleaning_factor: u32,

    /// Default lifetime in seconds for writes that don't specify one.
    ///
    /// Set via STASH_LIFETIME environment variable.
    #[serde(default = "default_lifetime")]
    pub lifetime: i64,

    /// Storage backend: "sqlite" or "memory".
    ///
    /// Set via STASH_BACKEND environment variable.
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_lifetime() -> i64 {
    86_400 // 1 day
}

fn default_backend() -> String {
    BACKEND_SQLITE.into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database: None,
            automatic_cleaning_factor: 0,
            lifetime: default_lifetime(),
            backend: default_backend(),
        }
    }
}

impl CacheConfig {
    /// Configuration for a file-backed (or `:memory:`) SQLite cache.
    pub fn sqlite(database: impl Into<PathBuf>) -> Self {
        Self { database: Some(database.into()), ..Default::default() }
    }

    /// Configuration for an ephemeral SQLite cache.
    pub fn in_memory() -> Self {
        Self::sqlite(IN_MEMORY)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STASH_`
    /// 2. TOML file from `STASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STASH_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Database location, required by the sqlite backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no database is configured.
    pub fn require_database(&self) -> Result<&Path, ConfigError> {
        self.database
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "database".into(),
                hint: "Set STASH_DATABASE to a file path or \":memory:\"".into(),
            })
    }
}
