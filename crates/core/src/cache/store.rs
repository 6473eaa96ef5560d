use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{CacheEntry, CacheKey};
use crate::errors::Result;

/// A single cache tier.
///
/// Stores are dumb: `get` returns whatever is present, expired or not, and
/// `put` overwrites unconditionally. Freshness policy lives above the tiers
/// so every implementation behaves identically under the service.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    async fn put(&self, entry: CacheEntry) -> Result<()>;

    async fn remove(&self, key: &CacheKey) -> Result<()>;

    /// Delete entries whose `expires_at` has passed. Returns the count.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
