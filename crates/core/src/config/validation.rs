//! Configuration validation rules.
//!
//! This module provides validation logic for `CacheConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{BACKEND_MEMORY, BACKEND_SQLITE, CacheConfig};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// `database` is not checked here; it is only required when a sqlite
    /// store is opened.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `lifetime` is negative
    /// - `backend` is neither "sqlite" nor "memory"
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifetime < 0 {
            return Err(ConfigError::Invalid { field: "lifetime".into(), reason: "must not be negative".into() });
        }

        if self.backend != BACKEND_SQLITE && self.backend != BACKEND_MEMORY {
            return Err(ConfigError::Invalid {
                field: "backend".into(),
                reason: format!("unknown backend {:?} (expected \"sqlite\" or \"memory\")", self.backend),
            });
        }

        if self.automatic_cleaning_factor == 1 {
            tracing::warn!(
                automatic_cleaning_factor = self.automatic_cleaning_factor,
                "automatic_cleaning_factor of 1 sweeps expired rows on every write"
            );
        }

        Ok(())
    }
}
