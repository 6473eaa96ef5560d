use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of the upstream that produced a piece of data.
///
/// `Synthetic` marks AI-approximated data; consumers must disclose it to the
/// end user, so the flag travels with every canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    TwelveData,
    Finnhub,
    AlphaVantage,
    Synthetic,
    Unknown,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::TwelveData => "TWELVE_DATA",
            DataSource::Finnhub => "FINNHUB",
            DataSource::AlphaVantage => "ALPHA_VANTAGE",
            DataSource::Synthetic => "SYNTHETIC",
            DataSource::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored source identifier. Unknown identifiers map to
    /// [`DataSource::Unknown`] rather than failing, so old rows written by a
    /// since-removed provider stay readable.
    pub fn parse(s: &str) -> DataSource {
        match s {
            "TWELVE_DATA" => DataSource::TwelveData,
            "FINNHUB" => DataSource::Finnhub,
            "ALPHA_VANTAGE" => DataSource::AlphaVantage,
            "SYNTHETIC" => DataSource::Synthetic,
            _ => DataSource::Unknown,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time quote in canonical form.
///
/// Ephemeral: constructed per successful fetch and held only by cache tiers,
/// never persisted as a domain row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    pub as_of: DateTime<Utc>,
    pub source: DataSource,
}

impl Quote {
    pub fn new(ticker: impl Into<String>, price: Decimal, source: DataSource) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: None,
            as_of: Utc::now(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn source_parse_round_trips() {
        for source in [
            DataSource::TwelveData,
            DataSource::Finnhub,
            DataSource::AlphaVantage,
            DataSource::Synthetic,
        ] {
            assert_eq!(DataSource::parse(source.as_str()), source);
        }
    }

    #[test]
    fn unknown_source_does_not_fail() {
        assert_eq!(DataSource::parse("YAHOO"), DataSource::Unknown);
    }

    #[test]
    fn quote_serde_round_trip_keeps_source() {
        let quote = Quote {
            ticker: "AAPL".to_string(),
            price: dec!(187.44),
            change: dec!(-1.02),
            change_percent: dec!(-0.54),
            volume: Some(48_210_000),
            as_of: Utc::now(),
            source: DataSource::Synthetic,
        };
        let json = serde_json::to_value(&quote).unwrap();
        let back: Quote = serde_json::from_value(json).unwrap();
        assert_eq!(back.price, quote.price);
        assert!(back.source.is_synthetic());
    }
}
