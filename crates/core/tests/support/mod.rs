//! In-memory storage and scripted providers shared by the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use stockpulse_core::cache::{CacheService, CacheStore, MemoryCache};
use stockpulse_core::clock::{Clock, FixedClock};
use stockpulse_core::collector::{
    AttemptRecord, BarStore, CollectionMetadata, CollectionStatus, HistoricalCollector,
    MetadataStore, UpsertOutcome,
};
use stockpulse_core::config::TtlPolicy;
use stockpulse_core::constants::MAX_CONSECUTIVE_FAILURES;
use stockpulse_core::errors::{Error, Result};
use stockpulse_core::market_data::{BatchConfig, FreshnessEvaluator, MarketDataService};
use stockpulse_market_data::{
    DataClass, DataSource, FallbackResolver, Fundamentals, HistoricalBar, HistoricalPeriod,
    MarketDataProvider, ProviderError, Quote,
};

/// Monday 15:00 UTC, inside the market window.
pub fn market_open_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 15, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Bar store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBarStore {
    bars: Mutex<HashMap<(String, NaiveDate), HistoricalBar>>,
}

impl MemoryBarStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bar_count(&self, ticker: &str) -> usize {
        self.bars
            .lock()
            .unwrap()
            .keys()
            .filter(|(t, _)| t == ticker)
            .count()
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn bars_in_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalBar>> {
        let bars = self.bars.lock().unwrap();
        let mut out: Vec<_> = bars
            .iter()
            .filter(|((t, date), _)| t == ticker && *date >= start && *date <= end)
            .map(|(_, bar)| bar.clone())
            .collect();
        out.sort_by_key(|b| b.date);
        Ok(out)
    }

    async fn upsert_bars(&self, ticker: &str, incoming: &[HistoricalBar]) -> Result<UpsertOutcome> {
        // Partition and apply under one lock, like the real store does in
        // one transaction.
        let mut bars = self.bars.lock().unwrap();
        let mut outcome = UpsertOutcome::default();
        for bar in incoming {
            let key = (ticker.to_string(), bar.date);
            if bars.insert(key, bar.clone()).is_some() {
                outcome.updated += 1;
            } else {
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn delete_before(&self, ticker: &str, cutoff: NaiveDate) -> Result<u64> {
        let mut bars = self.bars.lock().unwrap();
        let before = bars.len();
        bars.retain(|(t, date), _| t != ticker || *date >= cutoff);
        Ok((before - bars.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Metadata store
// ---------------------------------------------------------------------------

pub struct MemoryMetadataStore {
    rows: Mutex<HashMap<String, CollectionMetadata>>,
    clock: Arc<dyn Clock>,
}

impl MemoryMetadataStore {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(HashMap::new()),
            clock,
        })
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, ticker: &str) -> Result<Option<CollectionMetadata>> {
        Ok(self.rows.lock().unwrap().get(ticker).cloned())
    }

    async fn ensure_tracked(&self, ticker: &str, priority: i32) -> Result<CollectionMetadata> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry(ticker.to_string())
            .or_insert_with(|| CollectionMetadata::new(ticker, priority, self.clock.now()));
        if priority > row.priority {
            row.priority = priority;
        }
        Ok(row.clone())
    }

    async fn active_by_priority(&self) -> Result<Vec<CollectionMetadata>> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<_> = rows.values().filter(|m| m.is_active).cloned().collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(out)
    }

    async fn below_priority(&self, priority: i32) -> Result<Vec<CollectionMetadata>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|m| m.is_active && m.priority < priority)
            .cloned()
            .collect())
    }

    async fn record_attempt(
        &self,
        ticker: &str,
        record: AttemptRecord,
    ) -> Result<CollectionMetadata> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(ticker)
            .ok_or_else(|| Error::database(format!("untracked ticker: {}", ticker)))?;

        row.last_attempted_at = Some(record.at);
        row.updated_at = record.at;
        if record.succeeded {
            row.status = CollectionStatus::Success;
            row.last_succeeded_at = Some(record.at);
            row.consecutive_failures = 0;
        } else {
            row.status = CollectionStatus::Failed;
            row.consecutive_failures += 1;
            if row.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                row.is_active = false;
            }
        }
        Ok(row.clone())
    }
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

pub enum Step {
    Succeed,
    RateLimited,
    NotFound,
}

/// A provider that follows a script of outcomes, then keeps repeating the
/// last one. Counts invocations per operation.
pub struct ScriptedProvider {
    id: &'static str,
    classes: Vec<DataClass>,
    source: DataSource,
    script: Mutex<VecDeque<Step>>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        id: &'static str,
        classes: Vec<DataClass>,
        source: DataSource,
        script: Vec<Step>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            classes,
            source,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            match script.front() {
                Some(Step::Succeed) | None => Step::Succeed,
                Some(Step::RateLimited) => Step::RateLimited,
                Some(Step::NotFound) => Step::NotFound,
            }
        }
    }

    fn fail(&self, step: Step, symbol: &str) -> ProviderError {
        match step {
            Step::RateLimited => ProviderError::RateLimited {
                provider: self.id.to_string(),
            },
            _ => ProviderError::NotFound {
                provider: self.id.to_string(),
                symbol: symbol.to_string(),
            },
        }
    }

    pub fn month_of_bars(&self, symbol: &str, end: NaiveDate) -> Vec<HistoricalBar> {
        (0..22)
            .filter_map(|i| end.checked_sub_days(chrono::Days::new(i)))
            .map(|date| HistoricalBar {
                ticker: symbol.to_string(),
                date,
                open: dec!(99),
                high: dec!(101),
                low: dec!(98),
                close: dec!(100),
                volume: Some(1_000),
                source: self.source,
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn supports(&self, class: DataClass) -> bool {
        self.classes.contains(&class)
    }

    async fn fetch_quote(&self, symbol: &str) -> std::result::Result<Quote, ProviderError> {
        match self.next_step() {
            Step::Succeed => Ok(Quote {
                ticker: symbol.to_string(),
                price: dec!(187.44),
                change: dec!(-1.02),
                change_percent: dec!(-0.54),
                volume: Some(1_000_000),
                as_of: Utc::now(),
                source: self.source,
            }),
            step => Err(self.fail(step, symbol)),
        }
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        _period: HistoricalPeriod,
    ) -> std::result::Result<Vec<HistoricalBar>, ProviderError> {
        match self.next_step() {
            Step::Succeed => Ok(self.month_of_bars(symbol, market_open_instant().date_naive())),
            step => Err(self.fail(step, symbol)),
        }
    }

    async fn fetch_fundamentals(
        &self,
        symbol: &str,
    ) -> std::result::Result<Fundamentals, ProviderError> {
        match self.next_step() {
            Step::Succeed => {
                let mut f = Fundamentals::new(symbol, self.source);
                f.name = Some("Test Corp".to_string());
                f.pe_ratio = Some(dec!(22.5));
                Ok(f)
            }
            step => Err(self.fail(step, symbol)),
        }
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub struct Harness {
    pub service: Arc<MarketDataService>,
    pub collector: Arc<HistoricalCollector>,
    pub bars: Arc<MemoryBarStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub cache: Arc<CacheService>,
    pub clock: Arc<FixedClock>,
    pub freshness: Arc<FreshnessEvaluator>,
}

/// Build a full service over in-memory storage and the given providers.
pub fn harness(
    providers: Vec<Arc<ScriptedProvider>>,
    synthetic: Option<Arc<ScriptedProvider>>,
) -> Harness {
    let clock = Arc::new(FixedClock::new(market_open_instant()));
    let bars = MemoryBarStore::new();
    let metadata = MemoryMetadataStore::new(clock.clone());

    let ranked: Vec<Arc<dyn MarketDataProvider>> = providers
        .into_iter()
        .map(|p| p as Arc<dyn MarketDataProvider>)
        .collect();
    let synthetic = synthetic.map(|p| p as Arc<dyn MarketDataProvider>);
    let resolver = Arc::new(FallbackResolver::new(ranked, synthetic));

    let freshness = Arc::new(FreshnessEvaluator::new(TtlPolicy::default(), clock.clone()));
    let tiers: Vec<Arc<dyn CacheStore>> =
        vec![Arc::new(MemoryCache::new()), Arc::new(MemoryCache::new())];
    let cache = Arc::new(CacheService::new(tiers, freshness.clone()));
    let collector = Arc::new(HistoricalCollector::new(
        resolver.clone(),
        bars.clone(),
        metadata.clone(),
        clock.clone(),
    ));

    let service = Arc::new(MarketDataService::new(
        cache.clone(),
        resolver,
        collector.clone(),
        bars.clone(),
        metadata.clone(),
        freshness.clone(),
        BatchConfig::default(),
    ));

    Harness {
        service,
        collector,
        bars,
        metadata,
        cache,
        clock,
        freshness,
    }
}
