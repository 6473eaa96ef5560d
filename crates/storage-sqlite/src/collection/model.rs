//! Database model for collection metadata.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use stockpulse_core::collector::{CollectionMetadata, CollectionStatus};

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
#[diesel(table_name = crate::schema::collection_metadata)]
#[diesel(primary_key(ticker))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CollectionMetadataDB {
    pub ticker: String,
    pub priority: i32,
    pub status: String,
    pub last_attempted_at: Option<String>,
    pub last_succeeded_at: Option<String>,
    pub consecutive_failures: i32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl CollectionMetadataDB {
    pub fn from_domain(meta: &CollectionMetadata) -> Self {
        Self {
            ticker: meta.ticker.clone(),
            priority: meta.priority,
            status: meta.status.as_str().to_string(),
            last_attempted_at: meta.last_attempted_at.map(fmt_ts),
            last_succeeded_at: meta.last_succeeded_at.map(fmt_ts),
            consecutive_failures: meta.consecutive_failures,
            is_active: meta.is_active,
            created_at: fmt_ts(meta.created_at),
            updated_at: fmt_ts(meta.updated_at),
        }
    }

    pub fn into_domain(self) -> Result<CollectionMetadata, StorageError> {
        Ok(CollectionMetadata {
            priority: self.priority,
            status: CollectionStatus::parse(&self.status),
            last_attempted_at: parse_opt_ts(self.last_attempted_at.as_deref())?,
            last_succeeded_at: parse_opt_ts(self.last_succeeded_at.as_deref())?,
            consecutive_failures: self.consecutive_failures,
            is_active: self.is_active,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            ticker: self.ticker,
        })
    }
}

fn parse_opt_ts(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, StorageError> {
    raw.map(parse_ts).transpose()
}
