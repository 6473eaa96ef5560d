//! Core orchestration for the market data subsystem.
//!
//! Sits between the provider layer (`stockpulse-market-data`) and storage
//! (`stockpulse-storage-sqlite`):
//!
//! - [`cache`] — tiered read-through cache with backfill and stale-serve
//! - [`market_data`] — freshness policy, batch orchestration, and the
//!   [`market_data::MarketDataService`] read contract
//! - [`collector`] — historical collection, batched upserts, and the
//!   background scheduler
//! - [`config`] — environment-driven configuration
//!
//! Storage is abstracted behind the [`cache::CacheStore`],
//! [`collector::BarStore`], and [`collector::MetadataStore`] traits so tests
//! run against in-memory implementations.

pub mod cache;
pub mod clock;
pub mod collector;
pub mod config;
pub mod constants;
pub mod errors;
pub mod market_data;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, TtlPolicy};
pub use errors::{Error, Result};
