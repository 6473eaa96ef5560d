use std::sync::Arc;

use log::{debug, info, warn};
use stockpulse_market_data::{FallbackResolver, HistoricalBar, HistoricalPeriod};

use super::store::{AttemptRecord, BarStore, MetadataStore, UpsertOutcome};
use crate::clock::Clock;
use crate::constants::MAX_BARS_PER_COLLECTION;
use crate::errors::Result;

/// Summary of one collection run for a ticker.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub ticker: String,
    pub period: HistoricalPeriod,
    pub inserted: usize,
    pub updated: usize,
}

/// Fetches history through the resolver and lands it with batched upserts.
///
/// Metadata is updated on success and on failure alike, so the scheduler
/// always sees an honest last-attempt picture.
pub struct HistoricalCollector {
    resolver: Arc<FallbackResolver>,
    bars: Arc<dyn BarStore>,
    metadata: Arc<dyn MetadataStore>,
    clock: Arc<dyn Clock>,
}

impl HistoricalCollector {
    pub fn new(
        resolver: Arc<FallbackResolver>,
        bars: Arc<dyn BarStore>,
        metadata: Arc<dyn MetadataStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            bars,
            metadata,
            clock,
        }
    }

    /// Collect one period of history for one ticker.
    ///
    /// Re-running the same range is idempotent: existing dates are updated,
    /// new dates inserted, and the uniqueness of `(ticker, date)` is never
    /// violated.
    pub async fn collect(
        &self,
        ticker: &str,
        period: HistoricalPeriod,
    ) -> Result<CollectionReport> {
        let ticker = ticker.trim().to_uppercase();
        self.metadata.ensure_tracked(&ticker, 0).await?;

        let resolved = match self.resolver.resolve_history(&ticker, period).await {
            Ok(resolved) => resolved,
            Err(e) => {
                let meta = self
                    .metadata
                    .record_attempt(
                        &ticker,
                        AttemptRecord {
                            at: self.clock.now(),
                            succeeded: false,
                        },
                    )
                    .await?;
                if !meta.is_active {
                    warn!(
                        "deactivated {} after {} consecutive failures",
                        ticker, meta.consecutive_failures
                    );
                }
                return Err(e.into());
            }
        };

        let bars = Self::cap_bars(resolved.value);
        let outcome = self.upsert(&ticker, bars).await?;

        self.metadata
            .record_attempt(
                &ticker,
                AttemptRecord {
                    at: self.clock.now(),
                    succeeded: true,
                },
            )
            .await?;

        info!(
            "collected {} ({}): {} inserted, {} updated",
            ticker, period, outcome.inserted, outcome.updated
        );

        Ok(CollectionReport {
            ticker,
            period,
            inserted: outcome.inserted,
            updated: outcome.updated,
        })
    }

    /// Land a batch with one atomic upsert.
    async fn upsert(&self, ticker: &str, bars: Vec<HistoricalBar>) -> Result<UpsertOutcome> {
        if bars.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let outcome = self.bars.upsert_bars(ticker, &bars).await?;
        debug!(
            "upsert for {}: {} inserted, {} updated",
            ticker, outcome.inserted, outcome.updated
        );
        Ok(outcome)
    }

    /// Keep only the most recent bars when a provider over-delivers.
    fn cap_bars(mut bars: Vec<HistoricalBar>) -> Vec<HistoricalBar> {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        if bars.len() > MAX_BARS_PER_COLLECTION {
            bars.split_off(bars.len() - MAX_BARS_PER_COLLECTION)
        } else {
            bars
        }
    }
}
