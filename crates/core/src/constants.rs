//! Shared defaults for the subsystem.

/// Tickers seeded into collection metadata with top priority on first run.
pub const SEED_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "SPY", "QQQ",
];

/// Priority assigned to seed tickers.
pub const SEED_PRIORITY: i32 = 100;

/// Tickers at or above this priority belong to the short-cadence set and get
/// the wider sweep window.
pub const SHORT_CADENCE_PRIORITY: i32 = 50;

/// Tickers below this priority are subject to retention trimming.
pub const RETENTION_PRIORITY_FLOOR: i32 = 10;

/// Bars older than this many days are trimmed for low-priority tickers.
pub const RETENTION_MAX_AGE_DAYS: i64 = 730;

/// Consecutive collection failures before a ticker is deactivated.
pub const MAX_CONSECUTIVE_FAILURES: i32 = 5;

/// Hard cap on bars accepted from a single provider response.
pub const MAX_BARS_PER_COLLECTION: usize = 500;

/// Default cache TTLs in seconds, by data class.
pub const TTL_QUOTE_SECS: u64 = 300;
pub const TTL_HISTORICAL_SECS: u64 = 3_600;
pub const TTL_FUNDAMENTALS_SECS: u64 = 86_400;
pub const TTL_AI_ANALYSIS_SECS: u64 = 604_800;
pub const TTL_NEWS_SECS: u64 = 1_800;

/// Multiplier applied to the quote TTL while markets are closed.
pub const CLOSED_MARKET_TTL_FACTOR: u32 = 4;

/// Default scheduler cadences in seconds.
pub const PRIORITY_INTERVAL_SECS: u64 = 2 * 60 * 60;
pub const SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const RETENTION_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Pause between tickers inside a scheduler pass.
pub const INTER_TICKER_DELAY_MS: u64 = 500;

/// Delay before the first scheduler pass after startup.
pub const SCHEDULER_STARTUP_DELAY_SECS: u64 = 60;

/// Default batch orchestrator limits.
pub const BATCH_MAX_CONCURRENCY: usize = 8;
pub const PER_TICKER_TIMEOUT_SECS: u64 = 30;

/// Default per-adapter timeout inside the resolver.
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;
