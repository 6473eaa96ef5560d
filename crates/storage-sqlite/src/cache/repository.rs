use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use stockpulse_core::cache::{CacheEntry, CacheKey, CacheStore};
use stockpulse_core::Result;

use super::model::CacheEntryDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::stock_cache::dsl as cache_dsl;
use crate::utils::fmt_ts;

/// The persistent cache tier. Sits behind the in-memory tier so entries
/// survive a restart.
pub struct SqliteCacheRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteCacheRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheRepository {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let mut conn = get_connection(&self.pool)?;

        let row = cache_dsl::stock_cache
            .find((&key.ticker, key.class.as_str()))
            .first::<CacheEntryDB>(&mut conn)
            .optional()
            .into_core()?;

        match row {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let row = CacheEntryDB::from_domain(&entry)?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(cache_dsl::stock_cache)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let ticker = key.ticker.clone();
        let class = key.class.as_str();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(cache_dsl::stock_cache.find((&ticker, class)))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = fmt_ts(now);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<u64> {
                let purged = diesel::delete(
                    cache_dsl::stock_cache.filter(cache_dsl::expires_at.le(&cutoff)),
                )
                .execute(conn)
                .into_core()?;
                Ok(purged as u64)
            })
            .await
    }
}
