//! SQLite storage implementation for StockPulse.
//!
//! This crate is the only place where Diesel dependencies exist. Everything
//! above it works with the storage traits from `stockpulse-core`:
//!
//! - [`bars::SqliteBarRepository`] implements `collector::BarStore`
//! - [`collection::SqliteMetadataRepository`] implements `collector::MetadataStore`
//! - [`cache::SqliteCacheRepository`] implements `cache::CacheStore` as the
//!   persistent tier
//!
//! Reads go straight to the connection pool. All mutations are funneled
//! through a single writer actor ([`db::WriteHandle`]) so SQLite never sees
//! two competing write transactions.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod bars;
pub mod cache;
pub mod collection;

// Re-export database utilities
pub use db::{create_pool, get_connection, run_migrations, spawn_writer, DbConnection, DbPool, WriteHandle};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};
