//! Database models for daily bars.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use stockpulse_market_data::{DataSource, HistoricalBar};

use crate::errors::StorageError;
use crate::utils::{fmt_date, fmt_decimal, fmt_ts, parse_date, parse_decimal};

/// Database model for one daily bar. `(ticker, date)` is the primary key.
#[derive(
    Queryable,
    Identifiable,
    Selectable,
    Insertable,
    AsChangeset,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    PartialEq,
)]
#[diesel(table_name = crate::schema::historical_bars)]
#[diesel(primary_key(ticker, date))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HistoricalBarDB {
    pub ticker: String,
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: Option<i64>,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
}

impl HistoricalBarDB {
    pub fn from_domain(bar: &HistoricalBar, now: DateTime<Utc>) -> Self {
        let ts = fmt_ts(now);
        Self {
            ticker: bar.ticker.clone(),
            date: fmt_date(bar.date),
            open: fmt_decimal(bar.open),
            high: fmt_decimal(bar.high),
            low: fmt_decimal(bar.low),
            close: fmt_decimal(bar.close),
            volume: bar.volume,
            source: bar.source.as_str().to_string(),
            created_at: ts.clone(),
            updated_at: ts,
        }
    }

    pub fn into_domain(self) -> Result<HistoricalBar, StorageError> {
        Ok(HistoricalBar {
            date: parse_date(&self.date)?,
            open: parse_decimal(&self.open)?,
            high: parse_decimal(&self.high)?,
            low: parse_decimal(&self.low)?,
            close: parse_decimal(&self.close)?,
            volume: self.volume,
            source: DataSource::parse(&self.source),
            ticker: self.ticker,
        })
    }
}

/// Update payload for re-collected bars. Leaves `created_at` untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::historical_bars)]
#[diesel(treat_none_as_null = true)]
pub struct BarChangesetDB {
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: Option<i64>,
    pub source: String,
    pub updated_at: String,
}

impl BarChangesetDB {
    pub fn from_domain(bar: &HistoricalBar, now: DateTime<Utc>) -> Self {
        Self {
            open: fmt_decimal(bar.open),
            high: fmt_decimal(bar.high),
            low: fmt_decimal(bar.low),
            close: fmt_decimal(bar.close),
            volume: bar.volume,
            source: bar.source.as_str().to_string(),
            updated_at: fmt_ts(now),
        }
    }
}
