//! SQLite storage for per-ticker collection metadata.

mod model;
mod repository;

pub use model::CollectionMetadataDB;
pub use repository::SqliteMetadataRepository;

// Re-export trait from core for convenience
pub use stockpulse_core::collector::MetadataStore;
