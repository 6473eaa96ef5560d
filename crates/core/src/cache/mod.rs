//! Tiered cache hierarchy.
//!
//! Tiers are ordered near to far (process memory first, persistent store
//! last). The service probes in that order, backfills nearer tiers on a far
//! hit, and falls back to the freshest stale value anywhere before giving up.

mod memory;
mod model;
mod service;
mod store;

pub use memory::MemoryCache;
pub use model::{CacheEntry, CacheKey};
pub use service::{CacheService, CachedValue};
pub use store::CacheStore;
