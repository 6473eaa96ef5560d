//! Background cadences driving the collector.
//!
//! Three independent loops: a short cadence over priority tickers during
//! market hours, a daily sweep over everything active, and a weekly retention
//! pass trimming old bars for low-priority tickers and sweeping expired cache
//! entries. A ticker's failure never aborts a pass.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use stockpulse_market_data::HistoricalPeriod;
use tokio::task::JoinHandle;

use super::service::HistoricalCollector;
use super::store::{BarStore, MetadataStore};
use crate::cache::CacheService;
use crate::config::Config;
use crate::constants::{
    INTER_TICKER_DELAY_MS, PRIORITY_INTERVAL_SECS, RETENTION_INTERVAL_SECS,
    RETENTION_MAX_AGE_DAYS, RETENTION_PRIORITY_FLOOR, SCHEDULER_STARTUP_DELAY_SECS, SEED_PRIORITY,
    SHORT_CADENCE_PRIORITY, SWEEP_INTERVAL_SECS,
};
use crate::errors::Result;
use crate::market_data::freshness::FreshnessEvaluator;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub priority_interval: Duration,
    pub sweep_interval: Duration,
    pub retention_interval: Duration,
    pub startup_delay: Duration,
    pub inter_ticker_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            priority_interval: Duration::from_secs(PRIORITY_INTERVAL_SECS),
            sweep_interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
            retention_interval: Duration::from_secs(RETENTION_INTERVAL_SECS),
            startup_delay: Duration::from_secs(SCHEDULER_STARTUP_DELAY_SECS),
            inter_ticker_delay: Duration::from_millis(INTER_TICKER_DELAY_MS),
        }
    }
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            priority_interval: config.priority_interval,
            sweep_interval: config.sweep_interval,
            retention_interval: config.retention_interval,
            ..Self::default()
        }
    }
}

pub struct CollectorScheduler {
    collector: Arc<HistoricalCollector>,
    metadata: Arc<dyn MetadataStore>,
    bars: Arc<dyn BarStore>,
    freshness: Arc<FreshnessEvaluator>,
    cache: Option<Arc<CacheService>>,
    config: SchedulerConfig,
}

impl CollectorScheduler {
    pub fn new(
        collector: Arc<HistoricalCollector>,
        metadata: Arc<dyn MetadataStore>,
        bars: Arc<dyn BarStore>,
        freshness: Arc<FreshnessEvaluator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            collector,
            metadata,
            bars,
            freshness,
            cache: None,
            config,
        }
    }

    /// Have the retention pass also purge expired cache entries.
    pub fn with_cache(mut self, cache: Arc<CacheService>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register the configured priority tickers at top priority. Existing
    /// rows keep whatever priority they already have or higher.
    pub async fn seed(&self, tickers: &[String]) -> Result<()> {
        for ticker in tickers {
            self.metadata.ensure_tracked(ticker, SEED_PRIORITY).await?;
        }
        info!("seeded {} priority tickers", tickers.len());
        Ok(())
    }

    /// Short cadence over the priority set. Skipped entirely outside market
    /// hours. Returns the number of tickers collected.
    pub async fn run_priority_pass(&self) -> Result<usize> {
        let now = self.freshness.now();
        if !self.freshness.is_market_hours(now) {
            debug!("priority pass skipped, market closed");
            return Ok(0);
        }

        let period = HistoricalPeriod::OneMonth;
        let mut collected = 0;
        for meta in self.metadata.active_by_priority().await? {
            if meta.priority < SHORT_CADENCE_PRIORITY {
                break;
            }
            if self
                .freshness
                .is_collection_fresh(meta.last_succeeded_at, period, now)
            {
                continue;
            }
            match self.collector.collect(&meta.ticker, period).await {
                Ok(report) => {
                    collected += 1;
                    debug!(
                        "priority pass: {} +{}/{}",
                        report.ticker, report.inserted, report.updated
                    );
                }
                Err(e) => warn!("priority pass: {} failed: {}", meta.ticker, e),
            }
            tokio::time::sleep(self.config.inter_ticker_delay).await;
        }

        info!("priority pass collected {} tickers", collected);
        Ok(collected)
    }

    /// Daily sweep over every active ticker. Tickers collected successfully
    /// within the last day are skipped; higher-priority tickers get a wider
    /// window.
    pub async fn run_full_sweep(&self) -> Result<usize> {
        let now = self.freshness.now();
        let mut collected = 0;

        for meta in self.metadata.active_by_priority().await? {
            let recently_succeeded = meta
                .last_succeeded_at
                .map(|at| now - at < chrono::Duration::hours(24))
                .unwrap_or(false);
            if recently_succeeded {
                continue;
            }

            let period = if meta.priority >= SHORT_CADENCE_PRIORITY {
                HistoricalPeriod::ThreeMonths
            } else {
                HistoricalPeriod::OneMonth
            };

            match self.collector.collect(&meta.ticker, period).await {
                Ok(_) => collected += 1,
                Err(e) => warn!("full sweep: {} failed: {}", meta.ticker, e),
            }
            tokio::time::sleep(self.config.inter_ticker_delay).await;
        }

        info!("full sweep collected {} tickers", collected);
        Ok(collected)
    }

    /// Weekly retention: trim bars older than the retention window for
    /// low-priority tickers and purge expired cache entries. Returns the
    /// number of bars deleted.
    pub async fn run_retention(&self) -> Result<u64> {
        let cutoff =
            self.freshness.now().date_naive() - chrono::Duration::days(RETENTION_MAX_AGE_DAYS);
        let mut deleted = 0;

        for meta in self.metadata.below_priority(RETENTION_PRIORITY_FLOOR).await? {
            match self.bars.delete_before(&meta.ticker, cutoff).await {
                Ok(count) => deleted += count,
                Err(e) => warn!("retention: {} failed: {}", meta.ticker, e),
            }
        }

        if let Some(cache) = &self.cache {
            let purged = cache.purge_expired().await;
            debug!("retention pass purged {} expired cache entries", purged);
        }

        info!("retention pass deleted {} bars", deleted);
        Ok(deleted)
    }

    /// Spawn the three cadence loops. Handles are returned so a host can
    /// abort them on shutdown.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let priority = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(scheduler.config.startup_delay).await;
                let mut interval = tokio::time::interval(scheduler.config.priority_interval);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_priority_pass().await {
                        error!("priority pass aborted: {}", e);
                    }
                }
            })
        };

        let sweep = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(scheduler.config.startup_delay).await;
                let mut interval = tokio::time::interval(scheduler.config.sweep_interval);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_full_sweep().await {
                        error!("full sweep aborted: {}", e);
                    }
                }
            })
        };

        let retention = {
            let scheduler = self;
            tokio::spawn(async move {
                tokio::time::sleep(scheduler.config.startup_delay).await;
                let mut interval = tokio::time::interval(scheduler.config.retention_interval);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_retention().await {
                        error!("retention pass aborted: {}", e);
                    }
                }
            })
        };

        vec![priority, sweep, retention]
    }
}
