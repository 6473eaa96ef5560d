use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quote::DataSource;

/// One daily OHLCV bar in canonical form.
///
/// Persistence enforces exactly one bar per (ticker, date); adapters only
/// produce the wire form, the collector owns all writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
    pub source: DataSource,
}

/// Fixed enumeration of historical lookback windows exposed by the read
/// contract. Mirrors the period strings collaborators pass in (`1mo`, `1y`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalPeriod {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    Max,
}

impl HistoricalPeriod {
    /// Calendar days covered by the period. `Max` is capped at twenty years.
    pub fn days(&self) -> i64 {
        match self {
            HistoricalPeriod::OneDay => 1,
            HistoricalPeriod::FiveDays => 5,
            HistoricalPeriod::OneMonth => 30,
            HistoricalPeriod::ThreeMonths => 90,
            HistoricalPeriod::SixMonths => 180,
            HistoricalPeriod::OneYear => 365,
            HistoricalPeriod::TwoYears => 730,
            HistoricalPeriod::FiveYears => 1825,
            HistoricalPeriod::Max => 7300,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoricalPeriod::OneDay => "1d",
            HistoricalPeriod::FiveDays => "5d",
            HistoricalPeriod::OneMonth => "1mo",
            HistoricalPeriod::ThreeMonths => "3mo",
            HistoricalPeriod::SixMonths => "6mo",
            HistoricalPeriod::OneYear => "1y",
            HistoricalPeriod::TwoYears => "2y",
            HistoricalPeriod::FiveYears => "5y",
            HistoricalPeriod::Max => "max",
        }
    }
}

impl fmt::Display for HistoricalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoricalPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(HistoricalPeriod::OneDay),
            "5d" => Ok(HistoricalPeriod::FiveDays),
            "1mo" => Ok(HistoricalPeriod::OneMonth),
            "3mo" => Ok(HistoricalPeriod::ThreeMonths),
            "6mo" => Ok(HistoricalPeriod::SixMonths),
            "1y" => Ok(HistoricalPeriod::OneYear),
            "2y" => Ok(HistoricalPeriod::TwoYears),
            "5y" => Ok(HistoricalPeriod::FiveYears),
            "max" => Ok(HistoricalPeriod::Max),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_strings_round_trip() {
        for period in [
            HistoricalPeriod::OneDay,
            HistoricalPeriod::FiveDays,
            HistoricalPeriod::OneMonth,
            HistoricalPeriod::ThreeMonths,
            HistoricalPeriod::SixMonths,
            HistoricalPeriod::OneYear,
            HistoricalPeriod::TwoYears,
            HistoricalPeriod::FiveYears,
            HistoricalPeriod::Max,
        ] {
            assert_eq!(period.as_str().parse::<HistoricalPeriod>(), Ok(period));
        }
    }

    #[test]
    fn period_days_are_monotonic() {
        assert!(HistoricalPeriod::OneMonth.days() < HistoricalPeriod::OneYear.days());
        assert!(HistoricalPeriod::FiveYears.days() < HistoricalPeriod::Max.days());
    }

    #[test]
    fn rejects_unknown_period() {
        assert!("10y".parse::<HistoricalPeriod>().is_err());
    }
}
