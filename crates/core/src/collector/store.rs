use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use stockpulse_market_data::HistoricalBar;

use super::model::CollectionMetadata;
use crate::errors::Result;

/// Counts from one batched upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
}

/// Storage for daily bars.
///
/// The `(ticker, date)` pair is unique; all writes go through
/// `upsert_bars`, which partitions a batch against the stored dates and
/// applies it as a single transaction. Two concurrent collections of the
/// same ticker serialize on that transaction instead of racing each other
/// into a uniqueness violation.
#[async_trait]
pub trait BarStore: Send + Sync {
    async fn bars_in_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalBar>>;

    /// Insert new dates and update existing ones, atomically.
    async fn upsert_bars(&self, ticker: &str, bars: &[HistoricalBar]) -> Result<UpsertOutcome>;

    /// Drop bars older than `cutoff`. Returns the number deleted.
    async fn delete_before(&self, ticker: &str, cutoff: NaiveDate) -> Result<u64>;
}

/// One collection attempt, as recorded against the metadata row.
#[derive(Debug, Clone, Copy)]
pub struct AttemptRecord {
    pub at: DateTime<Utc>,
    pub succeeded: bool,
}

/// Storage for per-ticker collection metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, ticker: &str) -> Result<Option<CollectionMetadata>>;

    /// Create the row if the ticker is not yet tracked; never lowers an
    /// existing priority.
    async fn ensure_tracked(&self, ticker: &str, priority: i32) -> Result<CollectionMetadata>;

    /// Active tickers, highest priority first.
    async fn active_by_priority(&self) -> Result<Vec<CollectionMetadata>>;

    /// Active tickers strictly below a priority, for retention trimming.
    async fn below_priority(&self, priority: i32) -> Result<Vec<CollectionMetadata>>;

    /// Record an attempt outcome. A success resets the failure streak; a
    /// failure extends it, and implementations deactivate the ticker once
    /// the streak reaches the configured maximum. Returns the updated row.
    async fn record_attempt(&self, ticker: &str, record: AttemptRecord)
        -> Result<CollectionMetadata>;
}
