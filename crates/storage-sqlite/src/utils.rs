//! Utility functions for SQLite storage operations.
//!
//! Everything in the database is TEXT except volumes: decimals, dates and
//! timestamps all round-trip through the helpers here so every table encodes
//! them the same way.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::errors::StorageError;

/// Rows a single multi-row insert may carry.
///
/// SQLite has a compile-time limit on bind parameters (SQLITE_MAX_VARIABLE_NUMBER,
/// commonly 999 or 32766). 500 rows stays safely under it for every table in
/// this schema.
pub const SQLITE_MAX_ROWS_CHUNK: usize = 500;

/// Chunk a slice for batch inserts and `IN (...)` queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_ROWS_CHUNK)
}

/// RFC 3339 with fixed-width microseconds and a `Z` suffix. The fixed width
/// makes lexicographic comparison in SQL agree with chronological order.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Decode(format!("timestamp {:?}: {}", raw, e)))
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StorageError::Decode(format!("date {:?}: {}", raw, e)))
}

pub fn fmt_decimal(value: Decimal) -> String {
    value.to_string()
}

pub fn parse_decimal(raw: &str) -> Result<Decimal, StorageError> {
    raw.parse::<Decimal>()
        .map_err(|e| StorageError::Decode(format!("decimal {:?}: {}", raw, e)))
}
