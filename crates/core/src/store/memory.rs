//! In-process [`CacheStore`].
//!
//! Same contract as the SQLite store, backed by a `HashMap` behind a tokio
//! `RwLock`. Nothing survives the process.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::Error;
use crate::cache::expiry::{self, ExpirationPolicy, is_live};
use crate::cache::{CacheEntry, CleaningScheduler, Dice, KeyPattern};
use crate::config::CacheConfig;

use super::{CacheStore, CleanMode};

#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    policy: ExpirationPolicy,
    cleaner: CleaningScheduler,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_cleaner(config, CleaningScheduler::new(config.automatic_cleaning_factor))
    }

    pub fn with_dice(config: &CacheConfig, dice: impl Dice + 'static) -> Self {
        Self::with_cleaner(config, CleaningScheduler::with_dice(config.automatic_cleaning_factor, dice))
    }

    fn with_cleaner(config: &CacheConfig, cleaner: CleaningScheduler) -> Self {
        Self { entries: RwLock::new(HashMap::new()), policy: ExpirationPolicy::new(config.lifetime), cleaner }
    }

    async fn live(&self, key: &str) -> Option<CacheEntry> {
        let now = expiry::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|e| is_live(e.timeout, now))
            .cloned()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.live(key).await.map(|e| e.data))
    }

    async fn has(&self, key: &str) -> Result<bool, Error> {
        Ok(self.live(key).await.is_some())
    }

    async fn set(&self, key: &str, data: &str, lifetime: Option<i64>) -> Result<bool, Error> {
        let sweep = self.cleaner.should_sweep();

        let mut entries = self.entries.write().await;
        let now = expiry::now();
        if sweep {
            let before = entries.len();
            entries.retain(|_, e| e.timeout >= now);
            tracing::info!(deleted = before - entries.len(), "swept expired cache entries");
        }

        let entry = CacheEntry {
            key: key.to_string(),
            data: data.to_string(),
            timeout: self.policy.expires_at(lifetime, now),
            last_modified: now,
        };
        entries.insert(key.to_string(), entry);

        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn remove_pattern(&self, pattern: &str) -> Result<bool, Error> {
        let pattern = KeyPattern::compile(pattern)?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        Ok(entries.len() < before)
    }

    async fn clean(&self, mode: CleanMode) -> Result<bool, Error> {
        let mut entries = self.entries.write().await;
        match mode {
            CleanMode::All => entries.clear(),
            CleanMode::Old => {
                let now = expiry::now();
                entries.retain(|_, e| e.timeout >= now);
            }
        }
        Ok(true)
    }

    async fn get_timeout(&self, key: &str) -> Result<i64, Error> {
        Ok(self.live(key).await.map_or(0, |e| e.timeout))
    }

    async fn get_last_modified(&self, key: &str) -> Result<i64, Error> {
        Ok(self.live(key).await.map_or(0, |e| e.last_modified))
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, String>, Error> {
        let now = expiry::now();
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key))
            .filter(|e| is_live(e.timeout, now))
            .map(|e| (e.key.clone(), e.data.clone()))
            .collect())
    }

    async fn entry_count(&self) -> Result<u64, Error> {
        Ok(self.entries.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LoadedDice;

    #[tokio::test]
    async fn test_set_get_remove() {
        let cache = MemoryCache::new(&CacheConfig::default());
        cache.set("k", "v", Some(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(cache.remove("k").await.unwrap());
        assert!(!cache.remove("k").await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clean_old_keeps_live_entries() {
        let cache = MemoryCache::new(&CacheConfig::default());
        cache.set("old", "v", Some(-5)).await.unwrap();
        cache.set("new", "v", Some(60)).await.unwrap();

        cache.clean(CleanMode::Old).await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 1);
        assert!(cache.has("new").await.unwrap());
    }

    #[tokio::test]
    async fn test_forced_sweep() {
        let config = CacheConfig { automatic_cleaning_factor: 50, ..Default::default() };
        let cache = MemoryCache::with_dice(&config, LoadedDice(1));
        cache.set("old", "v", Some(-5)).await.unwrap();
        cache.set("new", "v", Some(60)).await.unwrap();

        assert_eq!(cache.entry_count().await.unwrap(), 1);
    }
}
