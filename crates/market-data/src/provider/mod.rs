//! Provider adapter trait and the concrete vendor adapters.
//!
//! An adapter owns exactly one vendor API. It normalizes vendor payloads into
//! the canonical models and vendor failures into [`ProviderError`]; nothing
//! vendor-shaped leaves this module.

mod alpha_vantage;
mod finnhub;
mod synthetic;
mod twelve_data;

pub use alpha_vantage::AlphaVantageProvider;
pub use finnhub::FinnhubProvider;
pub use synthetic::SyntheticProvider;
pub use twelve_data::TwelveDataProvider;

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{DataClass, Fundamentals, HistoricalBar, HistoricalPeriod, Quote};

/// A single upstream market data vendor.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// concurrently; the resolver shares one instance across all in-flight
/// requests.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Stable identifier, also used as the `source` tag on canonical values.
    fn id(&self) -> &'static str;

    /// Whether this adapter can serve the given data class at all.
    ///
    /// The resolver skips unsupported adapters without logging an attempt.
    fn supports(&self, class: DataClass) -> bool;

    /// Fetch the latest quote for a symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// Fetch daily bars covering the given lookback period, newest last.
    ///
    /// Default implementation reports the operation as unsupported.
    async fn fetch_history(
        &self,
        symbol: &str,
        period: HistoricalPeriod,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        let _ = (symbol, period);
        Err(ProviderError::Unsupported {
            provider: self.id().to_string(),
            operation: "historical".to_string(),
        })
    }

    /// Fetch company fundamentals.
    ///
    /// Default implementation reports the operation as unsupported.
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, ProviderError> {
        let _ = symbol;
        Err(ProviderError::Unsupported {
            provider: self.id().to_string(),
            operation: "fundamentals".to_string(),
        })
    }
}
