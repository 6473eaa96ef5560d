use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use stockpulse_core::cache::{CacheEntry, CacheKey, CacheStore};
use stockpulse_core::collector::{AttemptRecord, BarStore, CollectionStatus, MetadataStore};
use stockpulse_core::constants::MAX_CONSECUTIVE_FAILURES;
use stockpulse_core::{Clock, FixedClock};
use stockpulse_market_data::{DataClass, DataSource, HistoricalBar};
use stockpulse_storage_sqlite::bars::SqliteBarRepository;
use stockpulse_storage_sqlite::cache::SqliteCacheRepository;
use stockpulse_storage_sqlite::collection::SqliteMetadataRepository;
use stockpulse_storage_sqlite::{create_pool, run_migrations, spawn_writer};
use tempfile::TempDir;

struct Fixture {
    // Held so the database file outlives the repositories.
    _dir: TempDir,
    clock: Arc<FixedClock>,
    bars: SqliteBarRepository,
    metadata: SqliteMetadataRepository,
    cache: SqliteCacheRepository,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("stockpulse.db");
    let pool = create_pool(db_path.to_str().expect("utf-8 path")).expect("pool");
    run_migrations(&pool).expect("migrations");

    let writer = spawn_writer(pool.clone());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 15, 0, 0).unwrap(),
    ));

    Fixture {
        bars: SqliteBarRepository::new(pool.clone(), writer.clone(), clock.clone()),
        metadata: SqliteMetadataRepository::new(pool.clone(), writer.clone(), clock.clone()),
        cache: SqliteCacheRepository::new(pool, writer),
        clock,
        _dir: dir,
    }
}

fn bar(ticker: &str, date: NaiveDate, close: rust_decimal::Decimal) -> HistoricalBar {
    HistoricalBar {
        ticker: ticker.to_string(),
        date,
        open: close - dec!(1),
        high: close + dec!(2),
        low: close - dec!(2),
        close,
        volume: Some(1_000_000),
        source: DataSource::TwelveData,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
}

#[tokio::test]
async fn bars_round_trip_in_date_order() {
    let f = fixture();
    let inserts = vec![
        bar("AAPL", day(2), dec!(190.10)),
        bar("AAPL", day(1), dec!(189.55)),
        bar("AAPL", day(5), dec!(191.00)),
    ];

    let outcome = f.bars.upsert_bars("AAPL", &inserts).await.unwrap();
    assert_eq!(outcome.inserted, 3);
    assert_eq!(outcome.updated, 0);

    let loaded = f.bars.bars_in_range("AAPL", day(1), day(31)).await.unwrap();
    let dates: Vec<NaiveDate> = loaded.iter().map(|b| b.date).collect();
    assert_eq!(dates, vec![day(1), day(2), day(5)]);
    assert_eq!(loaded[0].close, dec!(189.55));
    assert_eq!(loaded[0].volume, Some(1_000_000));
    assert_eq!(loaded[0].source, DataSource::TwelveData);
}

#[tokio::test]
async fn an_overlapping_recollection_updates_in_place() {
    let f = fixture();
    f.bars
        .upsert_bars("AAPL", &[bar("AAPL", day(1), dec!(189.55))])
        .await
        .unwrap();

    // One known date and one new one; the store partitions internally.
    let outcome = f
        .bars
        .upsert_bars(
            "AAPL",
            &[
                bar("AAPL", day(1), dec!(200.00)),
                bar("AAPL", day(2), dec!(190.10)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.updated, 1);

    let loaded = f.bars.bars_in_range("AAPL", day(1), day(31)).await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].close, dec!(200.00));
}

#[tokio::test]
async fn concurrent_upserts_of_one_ticker_do_not_collide() {
    let f = fixture();
    let batch = vec![
        bar("AAPL", day(1), dec!(189.55)),
        bar("AAPL", day(2), dec!(190.10)),
    ];

    // Both runs see a consistent stored-date snapshot inside the writer
    // transaction, so neither can trip the primary key.
    let (first, second) = tokio::join!(
        f.bars.upsert_bars("AAPL", &batch),
        f.bars.upsert_bars("AAPL", &batch)
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.inserted + second.inserted, 2);
    assert_eq!(first.updated + second.updated, 2);

    let loaded = f.bars.bars_in_range("AAPL", day(1), day(31)).await.unwrap();
    assert_eq!(loaded.len(), 2);
}

#[tokio::test]
async fn delete_before_trims_only_older_bars() {
    let f = fixture();
    let inserts = vec![
        bar("AAPL", day(1), dec!(189.55)),
        bar("AAPL", day(2), dec!(190.10)),
        bar("AAPL", day(5), dec!(191.00)),
    ];
    f.bars.upsert_bars("AAPL", &inserts).await.unwrap();
    f.bars
        .upsert_bars("MSFT", &[bar("MSFT", day(1), dec!(420.00))])
        .await
        .unwrap();

    let deleted = f.bars.delete_before("AAPL", day(5)).await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = f.bars.bars_in_range("AAPL", day(1), day(31)).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].date, day(5));
    // Other tickers are untouched.
    assert_eq!(f.bars.bars_in_range("MSFT", day(1), day(31)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn ensure_tracked_creates_once_and_never_lowers_priority() {
    let f = fixture();

    let created = f.metadata.ensure_tracked("AAPL", 50).await.unwrap();
    assert_eq!(created.priority, 50);
    assert_eq!(created.status, CollectionStatus::Pending);
    assert!(created.is_active);
    assert!(created.last_attempted_at.is_none());

    let unchanged = f.metadata.ensure_tracked("AAPL", 10).await.unwrap();
    assert_eq!(unchanged.priority, 50);

    let raised = f.metadata.ensure_tracked("AAPL", 100).await.unwrap();
    assert_eq!(raised.priority, 100);
}

#[tokio::test]
async fn record_attempt_tracks_streaks_and_deactivates() {
    let f = fixture();
    f.metadata.ensure_tracked("NOPE", 0).await.unwrap();
    let now = f.clock.now();

    for n in 1..=MAX_CONSECUTIVE_FAILURES {
        let meta = f
            .metadata
            .record_attempt(
                "NOPE",
                AttemptRecord {
                    at: now,
                    succeeded: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(meta.consecutive_failures, n);
        assert_eq!(meta.status, CollectionStatus::Failed);
        assert_eq!(meta.is_active, n < MAX_CONSECUTIVE_FAILURES);
    }

    // A later success resets the streak but does not reactivate.
    let meta = f
        .metadata
        .record_attempt(
            "NOPE",
            AttemptRecord {
                at: now,
                succeeded: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(meta.consecutive_failures, 0);
    assert_eq!(meta.status, CollectionStatus::Success);
    assert!(meta.last_succeeded_at.is_some());
    assert!(!meta.is_active);
}

#[tokio::test]
async fn active_by_priority_orders_and_excludes_inactive() {
    let f = fixture();
    f.metadata.ensure_tracked("LOW", 10).await.unwrap();
    f.metadata.ensure_tracked("HIGH", 100).await.unwrap();
    f.metadata.ensure_tracked("MID", 50).await.unwrap();
    f.metadata.ensure_tracked("DEAD", 200).await.unwrap();
    let now = f.clock.now();
    for _ in 0..MAX_CONSECUTIVE_FAILURES {
        f.metadata
            .record_attempt(
                "DEAD",
                AttemptRecord {
                    at: now,
                    succeeded: false,
                },
            )
            .await
            .unwrap();
    }

    let active = f.metadata.active_by_priority().await.unwrap();
    let tickers: Vec<&str> = active.iter().map(|m| m.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["HIGH", "MID", "LOW"]);

    let low = f.metadata.below_priority(50).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].ticker, "LOW");
}

#[tokio::test]
async fn cache_entries_survive_expiry_until_purged() {
    let f = fixture();
    let now = f.clock.now();
    let key = CacheKey::new("AAPL", DataClass::Quote);
    let entry = CacheEntry::new(
        key.clone(),
        serde_json::json!({"price": "187.44"}),
        now,
        std::time::Duration::from_secs(300),
    );

    f.cache.put(entry.clone()).await.unwrap();

    let loaded = f.cache.get(&key).await.unwrap().unwrap();
    assert_eq!(loaded.payload, entry.payload);
    assert_eq!(loaded.cached_at, now);

    // Expired entries stay readable; stale-serve depends on that.
    let later = now + Duration::hours(1);
    let still_there = f.cache.get(&key).await.unwrap().unwrap();
    assert!(still_there.is_expired(later));

    let purged = f.cache.purge_expired(later).await.unwrap();
    assert_eq!(purged, 1);
    assert!(f.cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn cache_put_overwrites_per_ticker_and_class() {
    let f = fixture();
    let now = f.clock.now();
    let key = CacheKey::new("AAPL", DataClass::Quote);
    let ttl = std::time::Duration::from_secs(300);

    f.cache
        .put(CacheEntry::new(key.clone(), serde_json::json!({"price": "1"}), now, ttl))
        .await
        .unwrap();
    f.cache
        .put(CacheEntry::new(key.clone(), serde_json::json!({"price": "2"}), now, ttl))
        .await
        .unwrap();
    // Same ticker, different class, is a different row.
    f.cache
        .put(CacheEntry::new(
            CacheKey::new("AAPL", DataClass::Fundamentals),
            serde_json::json!({"name": "Apple"}),
            now,
            ttl,
        ))
        .await
        .unwrap();

    let quote = f.cache.get(&key).await.unwrap().unwrap();
    assert_eq!(quote.payload, serde_json::json!({"price": "2"}));

    f.cache.remove(&key).await.unwrap();
    assert!(f.cache.get(&key).await.unwrap().is_none());
    assert!(f
        .cache
        .get(&CacheKey::new("AAPL", DataClass::Fundamentals))
        .await
        .unwrap()
        .is_some());
}
