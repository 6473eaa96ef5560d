use serde::{Deserialize, Serialize};
use stockpulse_market_data::{
    DataSource, Fundamentals, HistoricalBar, HistoricalPeriod, Quote,
};

/// A quote as served to collaborators.
///
/// `stale` means the value was served past its TTL because every provider
/// failed; `source` survives end to end so synthetic data stays disclosed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote: Quote,
    pub source: DataSource,
    pub stale: bool,
}

impl QuoteResponse {
    pub fn new(quote: Quote, stale: bool) -> Self {
        Self {
            source: quote.source,
            quote,
            stale,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub ticker: String,
    pub period: HistoricalPeriod,
    pub bars: Vec<HistoricalBar>,
    pub source: DataSource,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsResponse {
    pub fundamentals: Fundamentals,
    pub source: DataSource,
    pub stale: bool,
}

impl FundamentalsResponse {
    pub fn new(fundamentals: Fundamentals, stale: bool) -> Self {
        Self {
            source: fundamentals.source,
            fundamentals,
            stale,
        }
    }
}
