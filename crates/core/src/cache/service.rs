use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use stockpulse_market_data::DataClass;

use super::model::{CacheEntry, CacheKey};
use super::store::CacheStore;
use crate::errors::{Error, Result};
use crate::market_data::freshness::FreshnessEvaluator;

/// A payload served from the cache hierarchy, with provenance flags.
#[derive(Debug, Clone)]
pub struct CachedValue {
    pub payload: serde_json::Value,
    pub cached_at: DateTime<Utc>,
    /// True when the value was served past its TTL because resolution failed.
    pub stale: bool,
}

/// Read-through cache over an ordered list of tiers.
///
/// A tier that errors is logged and skipped; the cache layer itself never
/// fails a read. The only terminal outcome is [`Error::Unavailable`], and
/// that requires resolution to have failed with nothing cached anywhere.
pub struct CacheService {
    tiers: Vec<Arc<dyn CacheStore>>,
    freshness: Arc<FreshnessEvaluator>,
}

impl CacheService {
    /// `tiers` are ordered near to far.
    pub fn new(tiers: Vec<Arc<dyn CacheStore>>, freshness: Arc<FreshnessEvaluator>) -> Self {
        Self { tiers, freshness }
    }

    pub fn freshness(&self) -> &FreshnessEvaluator {
        &self.freshness
    }

    /// First fresh hit, probing near to far. Far hits are backfilled into
    /// every nearer tier before they are returned.
    pub async fn get(&self, ticker: &str, class: DataClass) -> Result<Option<CacheEntry>> {
        let key = CacheKey::new(ticker, class);
        let now = self.freshness.now();

        for (depth, tier) in self.tiers.iter().enumerate() {
            let entry = match tier.get(&key).await {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("cache tier {} failed on get: {}", tier.name(), e);
                    continue;
                }
            };
            let Some(entry) = entry else { continue };
            if !self.freshness.is_fresh(&entry, now) {
                continue;
            }

            debug!(
                "cache hit for {}/{} in tier {}",
                key.ticker,
                class,
                tier.name()
            );
            self.backfill(&entry, depth).await;
            return Ok(Some(entry));
        }

        Ok(None)
    }

    /// Write an entry into every tier.
    pub async fn put_all(&self, entry: CacheEntry) {
        for tier in &self.tiers {
            if let Err(e) = tier.put(entry.clone()).await {
                warn!("cache tier {} failed on put: {}", tier.name(), e);
            }
        }
    }

    /// Serve from cache, resolving on a miss.
    ///
    /// On resolution exhaustion the freshest entry of any age, from any tier,
    /// is served flagged stale. Only with nothing cached anywhere does the
    /// caller see [`Error::Unavailable`]. Non-resolution errors from the
    /// closure propagate unchanged.
    pub async fn get_or_resolve<F, Fut>(
        &self,
        ticker: &str,
        class: DataClass,
        resolve: F,
    ) -> Result<CachedValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        if let Some(entry) = self.get(ticker, class).await? {
            return Ok(CachedValue {
                payload: entry.payload,
                cached_at: entry.cached_at,
                stale: false,
            });
        }

        let key = CacheKey::new(ticker, class);
        match resolve().await {
            Ok(payload) => {
                let now = self.freshness.now();
                let ttl = self.freshness.ttl_for(class, now);
                let entry = CacheEntry::new(key, payload.clone(), now, ttl);
                self.put_all(entry).await;
                Ok(CachedValue {
                    payload,
                    cached_at: now,
                    stale: false,
                })
            }
            Err(Error::Resolution(exhausted)) => {
                warn!(
                    "resolution exhausted for {}/{} after {} attempts, trying stale",
                    key.ticker,
                    class,
                    exhausted.attempts().len()
                );
                match self.freshest_any_age(&key).await {
                    Some(entry) => {
                        info!(
                            "serving stale {}/{} cached at {}",
                            key.ticker, class, entry.cached_at
                        );
                        Ok(CachedValue {
                            payload: entry.payload,
                            cached_at: entry.cached_at,
                            stale: true,
                        })
                    }
                    None => Err(Error::unavailable(key.ticker, class)),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Maintenance sweep over every tier.
    pub async fn purge_expired(&self) -> u64 {
        let now = self.freshness.now();
        let mut purged = 0;
        for tier in &self.tiers {
            match tier.purge_expired(now).await {
                Ok(count) => purged += count,
                Err(e) => warn!("cache tier {} failed on purge: {}", tier.name(), e),
            }
        }
        purged
    }

    async fn backfill(&self, entry: &CacheEntry, depth: usize) {
        for nearer in &self.tiers[..depth] {
            if let Err(e) = nearer.put(entry.clone()).await {
                warn!("backfill into tier {} failed: {}", nearer.name(), e);
            }
        }
    }

    /// The most recently cached entry for a key across all tiers, expired or
    /// not.
    async fn freshest_any_age(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut best: Option<CacheEntry> = None;
        for tier in &self.tiers {
            match tier.get(key).await {
                Ok(Some(entry)) => {
                    if best
                        .as_ref()
                        .map(|b| entry.cached_at > b.cached_at)
                        .unwrap_or(true)
                    {
                        best = Some(entry);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("cache tier {} failed on stale scan: {}", tier.name(), e),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::clock::FixedClock;
    use crate::config::TtlPolicy;
    use chrono::TimeZone;
    use serde_json::json;
    use stockpulse_market_data::models::{AttemptOutcome, ProviderAttempt};
    use stockpulse_market_data::ResolutionError;

    fn open_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 15, 0, 0).unwrap()
    }

    fn service_with_two_tiers(
        now: DateTime<Utc>,
    ) -> (CacheService, Arc<MemoryCache>, Arc<MemoryCache>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now));
        let near = Arc::new(MemoryCache::new());
        let far = Arc::new(MemoryCache::new());
        let freshness = Arc::new(FreshnessEvaluator::new(
            TtlPolicy::default(),
            clock.clone(),
        ));
        let service = CacheService::new(vec![near.clone(), far.clone()], freshness);
        (service, near, far, clock)
    }

    fn exhausted(ticker: &str, class: DataClass) -> Error {
        Error::Resolution(ResolutionError::Exhausted {
            ticker: ticker.to_string(),
            class,
            attempts: vec![ProviderAttempt {
                provider: "TWELVE_DATA",
                outcome: AttemptOutcome::TimedOut,
                latency: std::time::Duration::from_secs(10),
            }],
        })
    }

    #[tokio::test]
    async fn far_tier_hit_backfills_the_near_tier() {
        let now = open_instant();
        let (service, near, far, _) = service_with_two_tiers(now);

        let entry = CacheEntry::new(
            CacheKey::new("AAPL", DataClass::Quote),
            json!({"price": "187.44"}),
            now,
            std::time::Duration::from_secs(300),
        );
        far.put(entry).await.unwrap();
        assert_eq!(near.len(), 0);

        let hit = service.get("AAPL", DataClass::Quote).await.unwrap();
        assert!(hit.is_some());
        assert_eq!(near.len(), 1);
    }

    #[tokio::test]
    async fn resolve_populates_every_tier() {
        let now = open_instant();
        let (service, near, far, _) = service_with_two_tiers(now);

        let value = service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Ok(json!({"price": "187.44"}))
            })
            .await
            .unwrap();

        assert!(!value.stale);
        assert_eq!(near.len(), 1);
        assert_eq!(far.len(), 1);
    }

    #[tokio::test]
    async fn fresh_hit_skips_the_resolver() {
        let now = open_instant();
        let (service, _, _, _) = service_with_two_tiers(now);

        service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Ok(json!({"price": "1"}))
            })
            .await
            .unwrap();

        // Second call must not reach the closure.
        let value = service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                panic!("resolver must not run on a fresh hit")
            })
            .await
            .unwrap();
        assert_eq!(value.payload, json!({"price": "1"}));
    }

    #[tokio::test]
    async fn expired_entry_is_served_stale_when_resolution_fails() {
        let now = open_instant();
        let (service, _, _, clock) = service_with_two_tiers(now);

        service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Ok(json!({"price": "1"}))
            })
            .await
            .unwrap();

        // Push well past the quote TTL, then fail resolution.
        clock.advance(chrono::Duration::hours(6));
        let value = service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Err(exhausted("AAPL", DataClass::Quote))
            })
            .await
            .unwrap();

        assert!(value.stale);
        assert_eq!(value.payload, json!({"price": "1"}));
    }

    #[tokio::test]
    async fn nothing_cached_plus_exhaustion_is_unavailable() {
        let now = open_instant();
        let (service, _, _, _) = service_with_two_tiers(now);

        let err = service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Err(exhausted("AAPL", DataClass::Quote))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn expired_entries_do_not_count_as_hits() {
        let now = open_instant();
        let (service, _, _, clock) = service_with_two_tiers(now);

        service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Ok(json!({"price": "1"}))
            })
            .await
            .unwrap();

        clock.advance(chrono::Duration::hours(6));
        assert!(service.get("AAPL", DataClass::Quote).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_serve_picks_the_most_recent_entry() {
        let now = open_instant();
        let (service, near, far, clock) = service_with_two_tiers(now);

        let key = CacheKey::new("AAPL", DataClass::Quote);
        far.put(CacheEntry::new(
            key.clone(),
            json!({"price": "old"}),
            now - chrono::Duration::hours(10),
            std::time::Duration::from_secs(300),
        ))
        .await
        .unwrap();
        near.put(CacheEntry::new(
            key,
            json!({"price": "newer"}),
            now - chrono::Duration::hours(5),
            std::time::Duration::from_secs(300),
        ))
        .await
        .unwrap();

        clock.advance(chrono::Duration::hours(1));
        let value = service
            .get_or_resolve("AAPL", DataClass::Quote, || async {
                Err(exhausted("AAPL", DataClass::Quote))
            })
            .await
            .unwrap();

        assert!(value.stale);
        assert_eq!(value.payload, json!({"price": "newer"}));
    }
}
