use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stockpulse_market_data::DataClass;

/// Cache identity: one row per ticker per data class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub ticker: String,
    pub class: DataClass,
}

impl CacheKey {
    /// Tickers are normalized to uppercase so `aapl` and `AAPL` share a row.
    pub fn new(ticker: impl AsRef<str>, class: DataClass) -> Self {
        Self {
            ticker: ticker.as_ref().trim().to_uppercase(),
            class,
        }
    }
}

/// A cached payload with its timestamps.
///
/// Expired entries stay readable; whether one may still be served is the
/// freshness evaluator's call, not the store's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: serde_json::Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        payload: serde_json::Value,
        cached_at: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(i64::MAX / 2));
        Self {
            key,
            payload,
            cached_at,
            expires_at: cached_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }
}
