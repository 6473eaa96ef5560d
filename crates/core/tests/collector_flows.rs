mod support;

use chrono::Duration;
use stockpulse_core::collector::{BarStore, CollectionStatus, MetadataStore};
use stockpulse_core::Clock;
use stockpulse_core::constants::MAX_CONSECUTIVE_FAILURES;
use stockpulse_market_data::{DataClass, DataSource, HistoricalPeriod};
use support::{harness, ScriptedProvider, Step};

fn history_provider(script: Vec<Step>) -> std::sync::Arc<ScriptedProvider> {
    ScriptedProvider::new(
        "TWELVE_DATA",
        vec![DataClass::Quote, DataClass::Historical],
        DataSource::TwelveData,
        script,
    )
}

#[tokio::test]
async fn collecting_the_same_range_twice_is_idempotent() {
    let provider = history_provider(vec![Step::Succeed]);
    let h = harness(vec![provider], None);

    let first = h
        .collector
        .collect("AAPL", HistoricalPeriod::OneMonth)
        .await
        .unwrap();
    assert!(first.inserted > 0);
    assert_eq!(first.updated, 0);
    let stored = h.bars.bar_count("AAPL");

    let second = h
        .collector
        .collect("AAPL", HistoricalPeriod::OneMonth)
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, first.inserted);
    assert_eq!(h.bars.bar_count("AAPL"), stored);
}

#[tokio::test]
async fn concurrent_collections_of_one_ticker_both_land() {
    let provider = history_provider(vec![Step::Succeed]);
    let h = harness(vec![provider], None);

    let (first, second) = tokio::join!(
        h.collector.collect("AAPL", HistoricalPeriod::OneMonth),
        h.collector.collect("AAPL", HistoricalPeriod::OneMonth)
    );
    let first = first.unwrap();
    let second = second.unwrap();

    // One run inserts the dates, the other updates them in place.
    assert_eq!(first.inserted + second.inserted, 22);
    assert_eq!(first.updated + second.updated, 22);
    assert_eq!(h.bars.bar_count("AAPL"), 22);
}

#[tokio::test]
async fn metadata_records_success() {
    let provider = history_provider(vec![Step::Succeed]);
    let h = harness(vec![provider], None);

    h.collector
        .collect("AAPL", HistoricalPeriod::OneMonth)
        .await
        .unwrap();

    let meta = h.metadata.get("AAPL").await.unwrap().unwrap();
    assert_eq!(meta.status, CollectionStatus::Success);
    assert!(meta.last_succeeded_at.is_some());
    assert_eq!(meta.consecutive_failures, 0);
    assert!(meta.is_active);
}

#[tokio::test]
async fn metadata_records_failure_without_deactivating_early() {
    let provider = history_provider(vec![Step::NotFound]);
    let h = harness(vec![provider], None);

    let result = h.collector.collect("NOPE", HistoricalPeriod::OneMonth).await;
    assert!(result.is_err());

    let meta = h.metadata.get("NOPE").await.unwrap().unwrap();
    assert_eq!(meta.status, CollectionStatus::Failed);
    assert!(meta.last_attempted_at.is_some());
    assert!(meta.last_succeeded_at.is_none());
    assert_eq!(meta.consecutive_failures, 1);
    assert!(meta.is_active);
}

#[tokio::test]
async fn repeated_failures_deactivate_the_ticker() {
    let provider = history_provider(vec![Step::NotFound]);
    let h = harness(vec![provider], None);

    for _ in 0..MAX_CONSECUTIVE_FAILURES {
        let _ = h.collector.collect("NOPE", HistoricalPeriod::OneMonth).await;
    }

    let meta = h.metadata.get("NOPE").await.unwrap().unwrap();
    assert_eq!(meta.consecutive_failures, MAX_CONSECUTIVE_FAILURES);
    assert!(!meta.is_active);
}

#[tokio::test]
async fn a_success_resets_the_failure_streak() {
    let provider = history_provider(vec![
        Step::NotFound,
        Step::NotFound,
        Step::Succeed,
    ]);
    let h = harness(vec![provider], None);

    let _ = h.collector.collect("AAPL", HistoricalPeriod::OneMonth).await;
    let _ = h.collector.collect("AAPL", HistoricalPeriod::OneMonth).await;
    h.collector
        .collect("AAPL", HistoricalPeriod::OneMonth)
        .await
        .unwrap();

    let meta = h.metadata.get("AAPL").await.unwrap().unwrap();
    assert_eq!(meta.consecutive_failures, 0);
    assert!(meta.is_active);
}

#[tokio::test]
async fn history_falls_back_to_the_second_provider() {
    let primary = history_provider(vec![Step::RateLimited]);
    let secondary = ScriptedProvider::new(
        "ALPHA_VANTAGE",
        vec![DataClass::Quote, DataClass::Historical],
        DataSource::AlphaVantage,
        vec![Step::Succeed],
    );
    let h = harness(vec![primary.clone(), secondary.clone()], None);

    h.collector
        .collect("AAPL", HistoricalPeriod::OneMonth)
        .await
        .unwrap();

    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(), 1);

    let bars = h
        .bars
        .bars_in_range(
            "AAPL",
            h.clock.now().date_naive() - Duration::days(30),
            h.clock.now().date_naive(),
        )
        .await
        .unwrap();
    assert!(bars.iter().all(|b| b.source == DataSource::AlphaVantage));
}
