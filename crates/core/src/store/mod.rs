//! The generic cache contract and its backends.
//!
//! [`CacheStore`] is the operation set every backend implements, so callers
//! can swap the SQLite store for the in-process one (or any other
//! implementation) through configuration alone.

use std::collections::HashMap;

use crate::Error;
use crate::config::{BACKEND_MEMORY, BACKEND_SQLITE, CacheConfig};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Which rows [`CacheStore::clean`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanMode {
    /// Every row, live or not.
    #[default]
    All,
    /// Only rows whose timeout is already in the past.
    Old,
}

/// Key-value cache with per-entry expiration.
///
/// Misses are reported through return values (`None`, `false`, `0`, an
/// empty map), never as errors. Expired entries are invisible to every read.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Data of the live entry for `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Data of the live entry for `key`, or `default`.
    async fn get_or(&self, key: &str, default: &str) -> Result<String, Error> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }

    /// Whether a live entry exists for `key`.
    async fn has(&self, key: &str) -> Result<bool, Error>;

    /// Store `data` under `key` for `lifetime` seconds (or the configured
    /// default), replacing any previous entry.
    async fn set(&self, key: &str, data: &str, lifetime: Option<i64>) -> Result<bool, Error>;

    /// Remove the entry for `key`, live or not. Returns whether one existed.
    async fn remove(&self, key: &str) -> Result<bool, Error>;

    /// Remove every entry whose key matches the glob `pattern`, live or not.
    /// Returns whether anything was removed.
    async fn remove_pattern(&self, pattern: &str) -> Result<bool, Error>;

    /// Remove all entries ([`CleanMode::All`]) or only expired ones ([`CleanMode::Old`]).
    async fn clean(&self, mode: CleanMode) -> Result<bool, Error>;

    /// Expiry timestamp of the live entry for `key`, or 0.
    async fn get_timeout(&self, key: &str) -> Result<i64, Error>;

    /// Last-modified timestamp of the live entry for `key`, or 0.
    async fn get_last_modified(&self, key: &str) -> Result<i64, Error>;

    /// Live entries among `keys`, keyed by key.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, String>, Error>;

    /// Entries physically held, expired ones included.
    async fn entry_count(&self) -> Result<u64, Error>;
}

/// Open the backend selected by `config.backend`.
///
/// # Errors
///
/// - `Error::Configuration` if no driver exists for the configured backend
/// - any error from opening the selected backend
pub async fn open_store(config: &CacheConfig) -> Result<Box<dyn CacheStore>, Error> {
    match config.backend.as_str() {
        BACKEND_SQLITE => Ok(Box::new(SqliteCache::open(config).await?)),
        BACKEND_MEMORY => Ok(Box::new(MemoryCache::new(config))),
        other => Err(Error::Configuration(format!("no storage driver available for backend {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_sqlite_backend() {
        let store = open_store(&CacheConfig::in_memory()).await.unwrap();
        assert!(store.set("k", "v", Some(60)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let config = CacheConfig { backend: BACKEND_MEMORY.into(), ..Default::default() };
        let store = open_store(&config).await.unwrap();
        assert!(store.set("k", "v", Some(60)).await.unwrap());
        assert_eq!(store.get_or("k", "d").await.unwrap(), "v");
        assert_eq!(store.get_or("missing", "d").await.unwrap(), "d");
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let config = CacheConfig { backend: "apcu".into(), ..CacheConfig::in_memory() };
        let result = open_store(&config).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_sqlite_backend_requires_database() {
        let result = open_store(&CacheConfig::default()).await;
        assert!(matches!(result, Err(Error::Initialization(_))));
    }

    #[test]
    fn test_clean_mode_default() {
        assert_eq!(CleanMode::default(), CleanMode::All);
    }
}
