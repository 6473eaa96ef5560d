//! Ordered provider fallback with a synthesis terminal.
//!
//! The resolver walks the ranked adapter chain for one request. Every failure
//! class moves on to the next adapter; only after the whole chain is spent
//! does the synthesis fallback run. Synthesized answers keep their source tag
//! so consumers can tell an approximation from an observation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::errors::{ProviderError, ResolutionError};
use crate::models::{
    AttemptOutcome, DataClass, Fundamentals, HistoricalBar, HistoricalPeriod, ProviderAttempt,
    Quote,
};
use crate::provider::MarketDataProvider;

const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully resolved value together with the attempt log that led to it.
#[derive(Debug)]
pub struct Resolved<T> {
    pub value: T,
    pub attempts: Vec<ProviderAttempt>,
}

pub struct FallbackResolver {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    synthetic: Option<Arc<dyn MarketDataProvider>>,
    adapter_timeout: Duration,
}

impl FallbackResolver {
    /// `providers` must already be in priority order, best first.
    pub fn new(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        synthetic: Option<Arc<dyn MarketDataProvider>>,
    ) -> Self {
        Self {
            providers,
            synthetic,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Identifiers of the ranked providers, for diagnostics.
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub async fn resolve_quote(&self, ticker: &str) -> Result<Resolved<Quote>, ResolutionError> {
        let mut attempts = Vec::new();

        for provider in self.chain(DataClass::Quote) {
            let started = Instant::now();
            let result =
                tokio::time::timeout(self.adapter_timeout, provider.fetch_quote(ticker)).await;
            match Self::record(&mut attempts, provider.id(), started, result, ticker) {
                Some(quote) => {
                    debug!("resolved quote for {} via {}", ticker, provider.id());
                    return Ok(Resolved {
                        value: quote,
                        attempts,
                    });
                }
                None => continue,
            }
        }

        Err(ResolutionError::Exhausted {
            ticker: ticker.to_string(),
            class: DataClass::Quote,
            attempts,
        })
    }

    pub async fn resolve_history(
        &self,
        ticker: &str,
        period: HistoricalPeriod,
    ) -> Result<Resolved<Vec<HistoricalBar>>, ResolutionError> {
        let mut attempts = Vec::new();

        for provider in self.chain(DataClass::Historical) {
            let started = Instant::now();
            let result = tokio::time::timeout(
                self.adapter_timeout,
                provider.fetch_history(ticker, period),
            )
            .await;
            match Self::record(&mut attempts, provider.id(), started, result, ticker) {
                Some(bars) => {
                    debug!(
                        "resolved {} bars for {} ({}) via {}",
                        bars.len(),
                        ticker,
                        period,
                        provider.id()
                    );
                    return Ok(Resolved {
                        value: bars,
                        attempts,
                    });
                }
                None => continue,
            }
        }

        Err(ResolutionError::Exhausted {
            ticker: ticker.to_string(),
            class: DataClass::Historical,
            attempts,
        })
    }

    pub async fn resolve_fundamentals(
        &self,
        ticker: &str,
    ) -> Result<Resolved<Fundamentals>, ResolutionError> {
        let mut attempts = Vec::new();

        for provider in self.chain(DataClass::Fundamentals) {
            let started = Instant::now();
            let result =
                tokio::time::timeout(self.adapter_timeout, provider.fetch_fundamentals(ticker))
                    .await;
            match Self::record(&mut attempts, provider.id(), started, result, ticker) {
                Some(fundamentals) => {
                    debug!(
                        "resolved fundamentals for {} via {}",
                        ticker,
                        provider.id()
                    );
                    return Ok(Resolved {
                        value: fundamentals,
                        attempts,
                    });
                }
                None => continue,
            }
        }

        Err(ResolutionError::Exhausted {
            ticker: ticker.to_string(),
            class: DataClass::Fundamentals,
            attempts,
        })
    }

    /// Ranked providers supporting the class.
    fn ranked(&self, class: DataClass) -> impl Iterator<Item = &Arc<dyn MarketDataProvider>> {
        self.providers.iter().filter(move |p| p.supports(class))
    }

    /// Ranked providers followed by the synthesis terminal, where applicable.
    fn chain(&self, class: DataClass) -> impl Iterator<Item = &Arc<dyn MarketDataProvider>> {
        self.ranked(class).chain(
            self.synthetic
                .iter()
                .filter(move |p| p.supports(class)),
        )
    }

    /// Append an attempt entry and unwrap a success.
    fn record<T>(
        attempts: &mut Vec<ProviderAttempt>,
        provider: &'static str,
        started: Instant,
        result: Result<Result<T, ProviderError>, tokio::time::error::Elapsed>,
        ticker: &str,
    ) -> Option<T> {
        let latency = started.elapsed();
        match result {
            Ok(Ok(value)) => {
                attempts.push(ProviderAttempt {
                    provider,
                    outcome: AttemptOutcome::Success,
                    latency,
                });
                if provider == "SYNTHETIC" {
                    info!("served synthesized data for {}", ticker);
                }
                Some(value)
            }
            Ok(Err(err)) => {
                let kind = err.failure_kind();
                warn!("{} failed for {} ({:?}): {}", provider, ticker, kind, err);
                attempts.push(ProviderAttempt {
                    provider,
                    outcome: AttemptOutcome::Failed(kind),
                    latency,
                });
                None
            }
            Err(_) => {
                warn!(
                    "{} exceeded the {}ms adapter deadline for {}",
                    provider,
                    latency.as_millis(),
                    ticker
                );
                attempts.push(ProviderAttempt {
                    provider,
                    outcome: AttemptOutcome::TimedOut,
                    latency,
                });
                None
            }
        }
    }
}
