use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quote::DataSource;

/// Company fundamentals in canonical form.
///
/// Providers disagree wildly on which metrics they expose, so every metric is
/// optional. A struct with all metrics `None` still counts as a miss and must
/// not be produced by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fundamentals {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peg_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_book: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub as_of: DateTime<Utc>,
    pub source: DataSource,
}

impl Fundamentals {
    pub fn new(ticker: impl Into<String>, source: DataSource) -> Self {
        Self {
            ticker: ticker.into(),
            name: None,
            exchange: None,
            currency: None,
            sector: None,
            industry: None,
            market_cap: None,
            pe_ratio: None,
            peg_ratio: None,
            price_to_book: None,
            beta: None,
            eps: None,
            dividend_yield: None,
            fifty_two_week_high: None,
            fifty_two_week_low: None,
            description: None,
            as_of: Utc::now(),
            source,
        }
    }

    /// True when at least one metric beyond identity fields is populated.
    pub fn has_data(&self) -> bool {
        self.name.is_some()
            || self.market_cap.is_some()
            || self.pe_ratio.is_some()
            || self.eps.is_some()
            || self.dividend_yield.is_some()
            || self.fifty_two_week_high.is_some()
            || self.fifty_two_week_low.is_some()
            || self.sector.is_some()
            || self.description.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_fundamentals_report_no_data() {
        let f = Fundamentals::new("AAPL", DataSource::Finnhub);
        assert!(!f.has_data());
    }

    #[test]
    fn a_single_metric_counts_as_data() {
        let mut f = Fundamentals::new("AAPL", DataSource::Finnhub);
        f.pe_ratio = Some(dec!(28.4));
        assert!(f.has_data());
    }
}
