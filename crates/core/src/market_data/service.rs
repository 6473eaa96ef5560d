use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use stockpulse_market_data::{
    AlphaVantageProvider, DataClass, DataSource, FallbackResolver, FinnhubProvider,
    Fundamentals, HistoricalPeriod, MarketDataProvider, Quote, SyntheticProvider,
    TwelveDataProvider,
};

use super::batch::{self, BatchConfig};
use super::freshness::FreshnessEvaluator;
use super::model::{FundamentalsResponse, HistoryResponse, QuoteResponse};
use crate::cache::{CacheService, CacheStore};
use crate::clock::Clock;
use crate::collector::{BarStore, CollectionMetadata, HistoricalCollector, MetadataStore};
use crate::config::Config;
use crate::errors::{Error, Result};

/// The read contract for dashboard collaborators.
///
/// Every read goes through the cache hierarchy; every miss goes through the
/// fallback resolver. Callers never see provider errors, only values (fresh,
/// stale, or synthetic, each flagged as such) or [`Error::Unavailable`].
pub struct MarketDataService {
    cache: Arc<CacheService>,
    resolver: Arc<FallbackResolver>,
    collector: Arc<HistoricalCollector>,
    bars: Arc<dyn BarStore>,
    metadata: Arc<dyn MetadataStore>,
    freshness: Arc<FreshnessEvaluator>,
    batch: BatchConfig,
}

impl MarketDataService {
    /// Wire the whole subsystem from configuration and storage.
    ///
    /// `tiers` are cache tiers ordered near to far. A configuration with no
    /// vendor keys but an AI key yields a resolver holding only the synthesis
    /// fallback; the service still answers, everything flagged synthetic.
    pub fn from_parts(
        config: &Config,
        tiers: Vec<Arc<dyn CacheStore>>,
        bars: Arc<dyn BarStore>,
        metadata: Arc<dyn MetadataStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = Arc::new(build_resolver(config));
        let freshness = Arc::new(FreshnessEvaluator::new(config.ttls.clone(), clock.clone()));
        let cache = Arc::new(CacheService::new(tiers, freshness.clone()));
        let collector = Arc::new(HistoricalCollector::new(
            resolver.clone(),
            bars.clone(),
            metadata.clone(),
            clock,
        ));

        Self {
            cache,
            resolver,
            collector,
            bars,
            metadata,
            freshness,
            batch: BatchConfig::from_config(config),
        }
    }

    /// Assemble from pre-built parts. Used by tests and by hosts that build
    /// their own resolver.
    pub fn new(
        cache: Arc<CacheService>,
        resolver: Arc<FallbackResolver>,
        collector: Arc<HistoricalCollector>,
        bars: Arc<dyn BarStore>,
        metadata: Arc<dyn MetadataStore>,
        freshness: Arc<FreshnessEvaluator>,
        batch: BatchConfig,
    ) -> Self {
        Self {
            cache,
            resolver,
            collector,
            bars,
            metadata,
            freshness,
            batch,
        }
    }

    pub fn collector(&self) -> Arc<HistoricalCollector> {
        self.collector.clone()
    }

    pub fn freshness(&self) -> Arc<FreshnessEvaluator> {
        self.freshness.clone()
    }

    /// The cache hierarchy, for hosts wiring the retention pass.
    pub fn cache(&self) -> Arc<CacheService> {
        self.cache.clone()
    }

    pub async fn get_quote(&self, ticker: &str) -> Result<QuoteResponse> {
        let symbol = normalize(ticker)?;
        let resolver = self.resolver.clone();

        let value = self
            .cache
            .get_or_resolve(&symbol, DataClass::Quote, || {
                let symbol = symbol.clone();
                async move {
                    let resolved = resolver.resolve_quote(&symbol).await?;
                    Ok(serde_json::to_value(&resolved.value)?)
                }
            })
            .await?;

        let quote: Quote = serde_json::from_value(value.payload)?;
        Ok(QuoteResponse::new(quote, value.stale))
    }

    /// History is served from the bar store, collecting first when the last
    /// successful collection no longer covers the period. A failed collection
    /// degrades to whatever bars are already stored, flagged stale.
    pub async fn get_historical(
        &self,
        ticker: &str,
        period: HistoricalPeriod,
    ) -> Result<HistoryResponse> {
        let symbol = normalize(ticker)?;
        let meta = self.metadata.ensure_tracked(&symbol, 0).await?;
        let now = self.freshness.now();

        let mut stale = false;
        if !self
            .freshness
            .is_collection_fresh(meta.last_succeeded_at, period, now)
        {
            if let Err(e) = self.collector.collect(&symbol, period).await {
                warn!(
                    "collection for {} ({}) failed, serving stored bars: {}",
                    symbol, period, e
                );
                stale = true;
            }
        }

        let end = now.date_naive();
        let start = end - chrono::Duration::days(period.days());
        let bars = self.bars.bars_in_range(&symbol, start, end).await?;
        if bars.is_empty() {
            return Err(Error::unavailable(symbol, DataClass::Historical));
        }

        let source = bars
            .last()
            .map(|b| b.source)
            .unwrap_or(DataSource::Unknown);
        Ok(HistoryResponse {
            ticker: symbol,
            period,
            bars,
            source,
            stale,
        })
    }

    pub async fn get_fundamentals(&self, ticker: &str) -> Result<FundamentalsResponse> {
        let symbol = normalize(ticker)?;
        let resolver = self.resolver.clone();

        let value = self
            .cache
            .get_or_resolve(&symbol, DataClass::Fundamentals, || {
                let symbol = symbol.clone();
                async move {
                    let resolved = resolver.resolve_fundamentals(&symbol).await?;
                    Ok(serde_json::to_value(&resolved.value)?)
                }
            })
            .await?;

        let fundamentals: Fundamentals = serde_json::from_value(value.payload)?;
        Ok(FundamentalsResponse::new(fundamentals, value.stale))
    }

    /// Quotes for a whole watchlist. Failures are per-entry; the map always
    /// holds every requested ticker.
    pub async fn get_many_quotes(
        self: &Arc<Self>,
        tickers: &[String],
    ) -> HashMap<String, Result<QuoteResponse>> {
        let service = self.clone();
        batch::fetch_many(tickers, &self.batch, move |ticker| {
            let service = service.clone();
            async move { service.get_quote(&ticker).await }
        })
        .await
    }

    /// Register a ticker for background collection. Idempotent.
    pub async fn track_ticker(&self, ticker: &str, priority: i32) -> Result<CollectionMetadata> {
        let symbol = normalize(ticker)?;
        let meta = self.metadata.ensure_tracked(&symbol, priority).await?;
        info!("tracking {} at priority {}", meta.ticker, meta.priority);
        Ok(meta)
    }
}

fn normalize(ticker: &str) -> Result<String> {
    let symbol = ticker.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(Error::Validation("empty ticker".to_string()));
    }
    Ok(symbol)
}

/// Build the ranked provider chain from whichever API keys are configured.
pub fn build_resolver(config: &Config) -> FallbackResolver {
    let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();

    if let Some(key) = &config.twelve_data_api_key {
        providers.push(Arc::new(TwelveDataProvider::new(key.clone())));
    }
    if let Some(key) = &config.finnhub_api_key {
        providers.push(Arc::new(FinnhubProvider::new(key.clone())));
    }
    if let Some(key) = &config.alpha_vantage_api_key {
        providers.push(Arc::new(AlphaVantageProvider::new(key.clone())));
    }

    let synthetic: Option<Arc<dyn MarketDataProvider>> =
        config.openai_api_key.as_ref().map(|key| {
            Arc::new(SyntheticProvider::new(
                key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
            )) as Arc<dyn MarketDataProvider>
        });

    if !config.has_ranked_provider() {
        if synthetic.is_some() {
            warn!("no vendor API keys configured, running on synthesis only");
        } else {
            warn!("no provider configured at all, every resolution will exhaust");
        }
    } else {
        info!(
            "provider chain: {:?}, synthesis fallback: {}",
            providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            synthetic.is_some()
        );
    }

    FallbackResolver::new(providers, synthetic).with_adapter_timeout(config.provider_timeout)
}
