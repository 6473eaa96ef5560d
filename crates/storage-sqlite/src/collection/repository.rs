use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use stockpulse_core::collector::{AttemptRecord, CollectionMetadata, CollectionStatus, MetadataStore};
use stockpulse_core::constants::MAX_CONSECUTIVE_FAILURES;
use stockpulse_core::{Clock, Result};

use super::model::CollectionMetadataDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::collection_metadata::dsl as meta_dsl;
use crate::utils::fmt_ts;

pub struct SqliteMetadataRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    clock: Arc<dyn Clock>,
}

impl SqliteMetadataRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            writer,
            clock,
        }
    }
}

fn load_row(conn: &mut SqliteConnection, ticker: &str) -> Result<Option<CollectionMetadataDB>> {
    meta_dsl::collection_metadata
        .find(ticker)
        .first::<CollectionMetadataDB>(conn)
        .optional()
        .into_core()
}

#[async_trait]
impl MetadataStore for SqliteMetadataRepository {
    async fn get(&self, ticker: &str) -> Result<Option<CollectionMetadata>> {
        let mut conn = get_connection(&self.pool)?;
        match load_row(&mut conn, ticker)? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    async fn ensure_tracked(&self, ticker: &str, priority: i32) -> Result<CollectionMetadata> {
        let now = self.clock.now();
        let ticker = ticker.to_string();

        let row = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CollectionMetadataDB> {
                match load_row(conn, &ticker)? {
                    Some(existing) if existing.priority >= priority => Ok(existing),
                    Some(existing) => {
                        // Raise, never lower.
                        diesel::update(meta_dsl::collection_metadata.find(&ticker))
                            .set((
                                meta_dsl::priority.eq(priority),
                                meta_dsl::updated_at.eq(fmt_ts(now)),
                            ))
                            .execute(conn)
                            .into_core()?;
                        Ok(CollectionMetadataDB {
                            priority,
                            updated_at: fmt_ts(now),
                            ..existing
                        })
                    }
                    None => {
                        let row = CollectionMetadataDB::from_domain(&CollectionMetadata::new(
                            ticker.clone(),
                            priority,
                            now,
                        ));
                        diesel::insert_into(meta_dsl::collection_metadata)
                            .values(&row)
                            .execute(conn)
                            .into_core()?;
                        Ok(row)
                    }
                }
            })
            .await?;

        Ok(row.into_domain()?)
    }

    async fn active_by_priority(&self) -> Result<Vec<CollectionMetadata>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = meta_dsl::collection_metadata
            .filter(meta_dsl::is_active.eq(true))
            .order(meta_dsl::priority.desc())
            .load::<CollectionMetadataDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(Into::into))
            .collect()
    }

    async fn below_priority(&self, priority: i32) -> Result<Vec<CollectionMetadata>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = meta_dsl::collection_metadata
            .filter(meta_dsl::is_active.eq(true))
            .filter(meta_dsl::priority.lt(priority))
            .order(meta_dsl::priority.asc())
            .load::<CollectionMetadataDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(Into::into))
            .collect()
    }

    async fn record_attempt(
        &self,
        ticker: &str,
        record: AttemptRecord,
    ) -> Result<CollectionMetadata> {
        let ticker = ticker.to_string();

        let row = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CollectionMetadataDB> {
                let mut row = load_row(conn, &ticker)?.ok_or_else(|| {
                    stockpulse_core::Error::database(format!("{} is not tracked", ticker))
                })?;

                row.last_attempted_at = Some(fmt_ts(record.at));
                row.updated_at = fmt_ts(record.at);
                if record.succeeded {
                    row.status = CollectionStatus::Success.as_str().to_string();
                    row.last_succeeded_at = Some(fmt_ts(record.at));
                    row.consecutive_failures = 0;
                } else {
                    row.status = CollectionStatus::Failed.as_str().to_string();
                    row.consecutive_failures += 1;
                    if row.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        row.is_active = false;
                    }
                }

                diesel::update(meta_dsl::collection_metadata.find(&ticker))
                    .set(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(row)
            })
            .await?;

        Ok(row.into_domain()?)
    }
}
