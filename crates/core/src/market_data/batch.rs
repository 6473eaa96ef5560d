//! Bounded-concurrency batch fetches.
//!
//! One task per ticker behind a semaphore. Each task's deadline starts at
//! spawn and covers queueing for a permit, so the whole batch finishes
//! within one timeout window. A ticker's failure or timeout becomes a
//! per-entry error value; the batch as a whole always completes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::warn;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::constants::{BATCH_MAX_CONCURRENCY, PER_TICKER_TIMEOUT_SECS};
use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    pub per_ticker_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: BATCH_MAX_CONCURRENCY,
            per_ticker_timeout: Duration::from_secs(PER_TICKER_TIMEOUT_SECS),
        }
    }
}

impl BatchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrency: config.batch_max_concurrency,
            per_ticker_timeout: config.per_ticker_timeout,
        }
    }
}

/// Run `fetch` for every ticker, at most `max_concurrency` at a time.
pub async fn fetch_many<T, F, Fut>(
    tickers: &[String],
    config: &BatchConfig,
    fetch: F,
) -> HashMap<String, Result<T>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(tickers.len());

    for ticker in tickers {
        let ticker = ticker.trim().to_uppercase();
        let semaphore = semaphore.clone();
        let fetch = fetch.clone();
        let deadline = config.per_ticker_timeout;

        let handle = tokio::spawn({
            let ticker = ticker.clone();
            async move {
                // Waiting for a permit counts against the deadline.
                let attempt = async {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Err(Error::Validation(
                                "batch semaphore closed".to_string(),
                            ))
                        }
                    };
                    fetch(ticker.clone()).await
                };
                match tokio::time::timeout(deadline, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout { ticker }),
                }
            }
        });
        handles.push((ticker, handle));
    }

    let outcomes = join_all(handles.into_iter().map(|(ticker, handle)| async move {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!("batch task for {} failed to complete: {}", ticker, e);
                Err(Error::Validation(format!(
                    "fetch task for {} did not complete",
                    ticker
                )))
            }
        };
        (ticker, result)
    }))
    .await;

    outcomes.into_iter().collect()
}
