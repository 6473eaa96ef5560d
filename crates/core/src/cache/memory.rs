use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{CacheEntry, CacheKey};
use super::store::CacheStore;
use crate::errors::Result;

/// In-process tier. A mutex over a map is plenty at dashboard request rates.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use stockpulse_market_data::DataClass;

    fn entry(ticker: &str, ttl_secs: u64, cached_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(
            CacheKey::new(ticker, DataClass::Quote),
            json!({"price": "1"}),
            cached_at,
            std::time::Duration::from_secs(ttl_secs),
        )
    }

    #[tokio::test]
    async fn put_get_remove_round_trip() {
        let cache = MemoryCache::new();
        let now = Utc::now();
        cache.put(entry("AAPL", 300, now)).await.unwrap();

        let key = CacheKey::new("AAPL", DataClass::Quote);
        assert!(cache.get(&key).await.unwrap().is_some());

        cache.remove(&key).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_returns_expired_entries() {
        let cache = MemoryCache::new();
        let cached_at = Utc::now() - Duration::hours(2);
        cache.put(entry("AAPL", 300, cached_at)).await.unwrap();

        let key = CacheKey::new("AAPL", DataClass::Quote);
        let hit = cache.get(&key).await.unwrap().unwrap();
        assert!(hit.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn purge_removes_only_expired_entries() {
        let cache = MemoryCache::new();
        let now = Utc::now();
        cache
            .put(entry("OLD", 300, now - Duration::hours(2)))
            .await
            .unwrap();
        cache.put(entry("NEW", 300, now)).await.unwrap();

        let purged = cache.purge_expired(now).await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(cache.len(), 1);
    }
}
