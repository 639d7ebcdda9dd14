//! SQLite-backed [`CacheStore`].

use std::collections::HashMap;

use crate::Error;
use crate::cache::expiry::{self, ExpirationPolicy};
use crate::cache::{CacheDb, CleaningScheduler, Dice, KeyPattern};
use crate::config::CacheConfig;

use super::{CacheStore, CleanMode};

/// Keys longer than this still work but may be truncated by external tooling.
const RECOMMENDED_KEY_LEN: usize = 255;

/// Persistent cache over a single SQLite `cache` table.
///
/// Owns its store handle for its whole lifetime; independent instances
/// never share a connection.
#[derive(Debug)]
pub struct SqliteCache {
    db: CacheDb,
    policy: ExpirationPolicy,
    cleaner: CleaningScheduler,
}

impl SqliteCache {
    /// Open the cache configured by `config`.
    ///
    /// # Errors
    ///
    /// - `Error::Initialization` if `config.database` is missing
    /// - `Error::StoreUnavailable` / `Error::Schema` from opening the store
    pub async fn open(config: &CacheConfig) -> Result<Self, Error> {
        let cleaner = CleaningScheduler::new(config.automatic_cleaning_factor);
        Self::open_with_cleaner(config, cleaner).await
    }

    /// Open the cache with a caller-supplied source of randomness for the
    /// cleaning scheduler.
    pub async fn open_with_dice(config: &CacheConfig, dice: impl Dice + 'static) -> Result<Self, Error> {
        let cleaner = CleaningScheduler::with_dice(config.automatic_cleaning_factor, dice);
        Self::open_with_cleaner(config, cleaner).await
    }

    async fn open_with_cleaner(config: &CacheConfig, cleaner: CleaningScheduler) -> Result<Self, Error> {
        let database = config
            .require_database()
            .map_err(|e| Error::Initialization(e.to_string()))?;

        let db = CacheDb::open(database).await?;
        tracing::info!(
            database = %db.location().display(),
            automatic_cleaning_factor = cleaner.factor(),
            lifetime = config.lifetime,
            "opened sqlite cache"
        );

        Ok(Self { db, policy: ExpirationPolicy::new(config.lifetime), cleaner })
    }

    /// The underlying store handle, borrowed for inspection.
    ///
    /// `CacheDb` is not `Clone`, so the handle cannot outlive this cache.
    pub fn backend(&self) -> &CacheDb {
        &self.db
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.policy
    }
}

#[async_trait::async_trait]
impl CacheStore for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let entry = self.db.select_live(key, expiry::now()).await?;
        tracing::debug!(key, hit = entry.is_some(), "cache get");
        Ok(entry.map(|e| e.data))
    }

    async fn has(&self, key: &str) -> Result<bool, Error> {
        self.db.exists_live(key, expiry::now()).await
    }

    async fn set(&self, key: &str, data: &str, lifetime: Option<i64>) -> Result<bool, Error> {
        if key.len() > RECOMMENDED_KEY_LEN {
            tracing::warn!(key_len = key.len(), "cache key longer than {RECOMMENDED_KEY_LEN} bytes");
        }

        if self.cleaner.should_sweep() {
            let deleted = self.db.delete_all(true, expiry::now()).await?;
            tracing::info!(deleted, "swept expired cache entries");
        }

        let now = expiry::now();
        let timeout = self.policy.expires_at(lifetime, now);
        self.db.upsert(key, data, timeout, now).await?;
        tracing::debug!(key, timeout, "cache set");

        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, Error> {
        let deleted = self.db.delete_by_key(key).await?;
        tracing::debug!(key, deleted, "cache remove");
        Ok(deleted > 0)
    }

    async fn remove_pattern(&self, pattern: &str) -> Result<bool, Error> {
        let pattern = KeyPattern::compile(pattern)?;
        let source = pattern.as_str().to_string();

        let deleted = self.db.delete_by_predicate(move |key| pattern.is_match(key)).await?;
        tracing::debug!(pattern = %source, deleted, "cache remove by pattern");

        Ok(deleted > 0)
    }

    async fn clean(&self, mode: CleanMode) -> Result<bool, Error> {
        let deleted = self.db.delete_all(mode == CleanMode::Old, expiry::now()).await?;
        tracing::info!(?mode, deleted, "cache cleaned");
        Ok(true)
    }

    async fn get_timeout(&self, key: &str) -> Result<i64, Error> {
        self.db.select_timeout(key, expiry::now()).await
    }

    async fn get_last_modified(&self, key: &str) -> Result<i64, Error> {
        self.db.select_last_modified(key, expiry::now()).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, String>, Error> {
        self.db.select_live_many(keys, expiry::now()).await
    }

    async fn entry_count(&self) -> Result<u64, Error> {
        self.db.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LoadedDice;

    async fn cache() -> SqliteCache {
        SqliteCache::open(&CacheConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = cache().await;
        assert!(cache.set("k", "v", Some(60)).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(cache.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_default_lifetime_used() {
        let config = CacheConfig { lifetime: 3_600, ..CacheConfig::in_memory() };
        let cache = SqliteCache::open(&config).await.unwrap();

        let before = expiry::now();
        cache.set("k", "v", None).await.unwrap();
        let timeout = cache.get_timeout("k").await.unwrap();
        assert!(timeout >= before + 3_600);
        assert!(timeout <= expiry::now() + 3_600);
    }

    #[tokio::test]
    async fn test_zero_lifetime_is_stored_but_invisible() {
        let cache = cache().await;
        assert!(cache.set("k", "v", Some(0)).await.unwrap());
        assert!(!cache.has("k").await.unwrap());
        assert_eq!(cache.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_database_is_initialization_error() {
        let result = SqliteCache::open(&CacheConfig::default()).await;
        assert!(matches!(result, Err(Error::Initialization(_))));
    }

    #[tokio::test]
    async fn test_forced_sweep_on_set() {
        let config = CacheConfig { automatic_cleaning_factor: 1_000, ..CacheConfig::in_memory() };
        let cache = SqliteCache::open_with_dice(&config, LoadedDice(1)).await.unwrap();

        cache.set("stale", "v", Some(-10)).await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 1);

        cache.set("a", "1", Some(-10)).await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 1);
        assert_eq!(cache.backend().count().await.unwrap(), 1);

        cache.set("b", "2", Some(60)).await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 1);
        assert!(cache.has("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_suppressed_sweep_keeps_expired_rows() {
        let config = CacheConfig { automatic_cleaning_factor: 1_000, ..CacheConfig::in_memory() };
        let cache = SqliteCache::open_with_dice(&config, LoadedDice(u32::MAX)).await.unwrap();

        cache.set("a", "1", Some(-10)).await.unwrap();
        cache.set("b", "2", Some(-10)).await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_pattern_reports_removal() {
        let cache = cache().await;
        cache.set("a", "1", Some(60)).await.unwrap();

        assert!(cache.remove_pattern("a*").await.unwrap());
        assert!(!cache.remove_pattern("a*").await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_handle() {
        let cache = cache().await;
        assert!(cache.backend().is_in_memory());
        assert_eq!(cache.policy().default_lifetime(), 86_400);
    }
}
