//! Environment-driven configuration.
//!
//! Every knob has a default; a process with no environment at all comes up in
//! a degraded-but-working state (no ranked providers means the resolver only
//! has the synthesis fallback, if an AI key is present).

use std::env;
use std::time::Duration;

use stockpulse_market_data::DataClass;

use crate::constants;

/// Per-class cache TTLs.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    pub quote: Duration,
    pub historical: Duration,
    pub fundamentals: Duration,
    pub ai_analysis: Duration,
    pub news: Duration,
}

impl TtlPolicy {
    pub fn for_class(&self, class: DataClass) -> Duration {
        match class {
            DataClass::Quote => self.quote,
            DataClass::Historical => self.historical,
            DataClass::Fundamentals => self.fundamentals,
            DataClass::AiAnalysis => self.ai_analysis,
            DataClass::News => self.news,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(constants::TTL_QUOTE_SECS),
            historical: Duration::from_secs(constants::TTL_HISTORICAL_SECS),
            fundamentals: Duration::from_secs(constants::TTL_FUNDAMENTALS_SECS),
            ai_analysis: Duration::from_secs(constants::TTL_AI_ANALYSIS_SECS),
            news: Duration::from_secs(constants::TTL_NEWS_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub twelve_data_api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub database_path: String,
    pub ttls: TtlPolicy,
    pub priority_tickers: Vec<String>,
    pub provider_timeout: Duration,
    pub per_ticker_timeout: Duration,
    pub batch_max_concurrency: usize,
    pub priority_interval: Duration,
    pub sweep_interval: Duration,
    pub retention_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            twelve_data_api_key: None,
            finnhub_api_key: None,
            alpha_vantage_api_key: None,
            openai_api_key: None,
            openai_base_url: None,
            openai_model: None,
            database_path: "stockpulse.db".to_string(),
            ttls: TtlPolicy::default(),
            priority_tickers: constants::SEED_TICKERS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            provider_timeout: Duration::from_secs(constants::PROVIDER_TIMEOUT_SECS),
            per_ticker_timeout: Duration::from_secs(constants::PER_TICKER_TIMEOUT_SECS),
            batch_max_concurrency: constants::BATCH_MAX_CONCURRENCY,
            priority_interval: Duration::from_secs(constants::PRIORITY_INTERVAL_SECS),
            sweep_interval: Duration::from_secs(constants::SWEEP_INTERVAL_SECS),
            retention_interval: Duration::from_secs(constants::RETENTION_INTERVAL_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let priority_tickers = env::var("PRIORITY_TICKERS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.priority_tickers);

        Self {
            twelve_data_api_key: non_empty_var("TWELVE_DATA_API_KEY"),
            finnhub_api_key: non_empty_var("FINNHUB_API_KEY"),
            alpha_vantage_api_key: non_empty_var("ALPHA_VANTAGE_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL"),
            openai_model: non_empty_var("OPENAI_MODEL"),
            database_path: non_empty_var("DATABASE_PATH").unwrap_or(defaults.database_path),
            ttls: TtlPolicy {
                quote: secs_var("CACHE_TTL_QUOTE_SECS", defaults.ttls.quote),
                historical: secs_var("CACHE_TTL_HISTORICAL_SECS", defaults.ttls.historical),
                fundamentals: secs_var("CACHE_TTL_FUNDAMENTALS_SECS", defaults.ttls.fundamentals),
                ai_analysis: secs_var("CACHE_TTL_AI_ANALYSIS_SECS", defaults.ttls.ai_analysis),
                news: secs_var("CACHE_TTL_NEWS_SECS", defaults.ttls.news),
            },
            priority_tickers,
            provider_timeout: secs_var("PROVIDER_TIMEOUT_SECS", defaults.provider_timeout),
            per_ticker_timeout: secs_var("PER_TICKER_TIMEOUT_SECS", defaults.per_ticker_timeout),
            batch_max_concurrency: usize_var(
                "BATCH_MAX_CONCURRENCY",
                defaults.batch_max_concurrency,
            ),
            priority_interval: secs_var(
                "COLLECTOR_PRIORITY_INTERVAL_SECS",
                defaults.priority_interval,
            ),
            sweep_interval: secs_var("COLLECTOR_SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            retention_interval: secs_var(
                "COLLECTOR_RETENTION_INTERVAL_SECS",
                defaults.retention_interval,
            ),
        }
    }

    /// True when at least one real vendor key is configured.
    pub fn has_ranked_provider(&self) -> bool {
        self.twelve_data_api_key.is_some()
            || self.finnhub_api_key.is_some()
            || self.alpha_vantage_api_key.is_some()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn usize_var(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
