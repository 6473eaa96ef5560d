//! Database model for cache entries.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use stockpulse_core::cache::{CacheEntry, CacheKey};
use stockpulse_market_data::DataClass;

use crate::errors::StorageError;
use crate::utils::{fmt_ts, parse_ts};

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
#[diesel(table_name = crate::schema::stock_cache)]
#[diesel(primary_key(ticker, data_class))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CacheEntryDB {
    pub ticker: String,
    pub data_class: String,
    pub payload: String,
    pub cached_at: String,
    pub expires_at: String,
}

impl CacheEntryDB {
    pub fn from_domain(entry: &CacheEntry) -> Result<Self, StorageError> {
        let payload = serde_json::to_string(&entry.payload)
            .map_err(|e| StorageError::Decode(format!("payload: {}", e)))?;
        Ok(Self {
            ticker: entry.key.ticker.clone(),
            data_class: entry.key.class.as_str().to_string(),
            payload,
            cached_at: fmt_ts(entry.cached_at),
            expires_at: fmt_ts(entry.expires_at),
        })
    }

    pub fn into_domain(self) -> Result<CacheEntry, StorageError> {
        let class: DataClass = self
            .data_class
            .parse()
            .map_err(StorageError::Decode)?;
        let payload = serde_json::from_str(&self.payload)
            .map_err(|e| StorageError::Decode(format!("payload: {}", e)))?;
        Ok(CacheEntry {
            key: CacheKey::new(self.ticker, class),
            payload,
            cached_at: parse_ts(&self.cached_at)?,
            expires_at: parse_ts(&self.expires_at)?,
        })
    }
}
