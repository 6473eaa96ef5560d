use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::SqliteConnection;
use stockpulse_core::collector::{BarStore, UpsertOutcome};
use stockpulse_core::{Clock, Result};
use stockpulse_market_data::HistoricalBar;

use super::model::{BarChangesetDB, HistoricalBarDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::historical_bars::dsl as bars_dsl;
use crate::utils::{chunk_for_sqlite, fmt_date, parse_date};

pub struct SqliteBarRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    clock: Arc<dyn Clock>,
}

impl SqliteBarRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            writer,
            clock,
        }
    }
}

#[async_trait]
impl BarStore for SqliteBarRepository {
    async fn bars_in_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalBar>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = bars_dsl::historical_bars
            .filter(bars_dsl::ticker.eq(ticker))
            .filter(bars_dsl::date.ge(fmt_date(start)))
            .filter(bars_dsl::date.le(fmt_date(end)))
            .order(bars_dsl::date.asc())
            .load::<HistoricalBarDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(Into::into))
            .collect()
    }

    async fn upsert_bars(&self, ticker: &str, bars: &[HistoricalBar]) -> Result<UpsertOutcome> {
        if bars.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let now = self.clock.now();
        let ticker = ticker.to_string();
        let bars = bars.to_vec();

        // The stored-date read, the partition, and the writes all run inside
        // one writer-actor transaction; concurrent collections of the same
        // ticker serialize there instead of racing into the unique index.
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UpsertOutcome> {
                let raw: Vec<String> = bars_dsl::historical_bars
                    .filter(bars_dsl::ticker.eq(&ticker))
                    .select(bars_dsl::date)
                    .load(conn)
                    .into_core()?;
                let existing = raw
                    .iter()
                    .map(|d| parse_date(d).map_err(Into::into))
                    .collect::<Result<HashSet<NaiveDate>>>()?;

                let mut insert_rows: Vec<HistoricalBarDB> = Vec::new();
                let mut update_rows: Vec<(String, BarChangesetDB)> = Vec::new();
                for bar in &bars {
                    if existing.contains(&bar.date) {
                        update_rows.push((fmt_date(bar.date), BarChangesetDB::from_domain(bar, now)));
                    } else {
                        insert_rows.push(HistoricalBarDB::from_domain(bar, now));
                    }
                }

                let mut outcome = UpsertOutcome::default();

                for chunk in chunk_for_sqlite(&insert_rows) {
                    outcome.inserted += diesel::insert_into(bars_dsl::historical_bars)
                        .values(chunk)
                        .execute(conn)
                        .into_core()?;
                }

                for (date, changes) in &update_rows {
                    outcome.updated += diesel::update(
                        bars_dsl::historical_bars
                            .filter(bars_dsl::ticker.eq(&ticker))
                            .filter(bars_dsl::date.eq(date)),
                    )
                    .set(changes)
                    .execute(conn)
                    .into_core()?;
                }

                Ok(outcome)
            })
            .await
    }

    async fn delete_before(&self, ticker: &str, cutoff: NaiveDate) -> Result<u64> {
        let ticker = ticker.to_string();
        let cutoff = fmt_date(cutoff);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<u64> {
                let deleted = diesel::delete(
                    bars_dsl::historical_bars
                        .filter(bars_dsl::ticker.eq(&ticker))
                        .filter(bars_dsl::date.lt(&cutoff)),
                )
                .execute(conn)
                .into_core()?;
                Ok(deleted as u64)
            })
            .await
    }
}
