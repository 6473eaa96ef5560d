//! SQLite storage for daily bars.

mod model;
mod repository;

pub use model::{BarChangesetDB, HistoricalBarDB};
pub use repository::SqliteBarRepository;

// Re-export trait from core for convenience
pub use stockpulse_core::collector::BarStore;
