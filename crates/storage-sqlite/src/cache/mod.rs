//! SQLite cache tier.

mod model;
mod repository;

pub use model::CacheEntryDB;
pub use repository::SqliteCacheRepository;

// Re-export trait from core for convenience
pub use stockpulse_core::cache::CacheStore;
