//! Freshness policy for cached values and collected history.
//!
//! All decisions take the injected clock so tests can sit on either side of
//! a TTL boundary or the market close.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use stockpulse_market_data::{DataClass, HistoricalPeriod};

use crate::cache::CacheEntry;
use crate::clock::Clock;
use crate::config::TtlPolicy;
use crate::constants::CLOSED_MARKET_TTL_FACTOR;

/// US regular session approximated as a fixed UTC window.
const MARKET_OPEN_MINUTES: u32 = 14 * 60 + 30;
const MARKET_CLOSE_MINUTES: u32 = 21 * 60;

pub struct FreshnessEvaluator {
    ttls: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl FreshnessEvaluator {
    pub fn new(ttls: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { ttls, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Monday through Friday, 14:30 to 21:00 UTC. Exchange holidays are
    /// ignored; a closed holiday just means slightly stale quotes that day.
    pub fn is_market_hours(&self, now: DateTime<Utc>) -> bool {
        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let minutes = now.time().hour() * 60 + now.time().minute();
        (MARKET_OPEN_MINUTES..MARKET_CLOSE_MINUTES).contains(&minutes)
    }

    /// Effective TTL for a class at a moment in time. Quotes cannot move
    /// while the market is closed, so their TTL is relaxed.
    pub fn ttl_for(&self, class: DataClass, now: DateTime<Utc>) -> Duration {
        let base = self.ttls.for_class(class);
        if class == DataClass::Quote && !self.is_market_hours(now) {
            base * CLOSED_MARKET_TTL_FACTOR
        } else {
            base
        }
    }

    /// Whether a cache entry may be served as fresh.
    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let ttl = self.ttl_for(entry.key.class, now);
        let age = entry.age(now);
        age >= chrono::Duration::zero()
            && age
                .to_std()
                .map(|age| age < ttl)
                .unwrap_or(false)
    }

    /// How long collected history for a lookback period stays fresh.
    ///
    /// Short ranges move with the market; month-scale ranges change daily;
    /// anything longer is effectively static week to week.
    pub fn collection_ttl(&self, period: HistoricalPeriod, now: DateTime<Utc>) -> Duration {
        match period.days() {
            0..=5 => {
                if self.is_market_hours(now) {
                    Duration::from_secs(30 * 60)
                } else {
                    Duration::from_secs(60 * 60)
                }
            }
            6..=30 => Duration::from_secs(24 * 60 * 60),
            _ => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    /// Whether the last successful collection still covers a period.
    pub fn is_collection_fresh(
        &self,
        last_succeeded_at: Option<DateTime<Utc>>,
        period: HistoricalPeriod,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(succeeded_at) = last_succeeded_at else {
            return false;
        };
        let ttl = self.collection_ttl(period, now);
        (now - succeeded_at)
            .to_std()
            .map(|age| age < ttl)
            .unwrap_or(true)
    }

}
