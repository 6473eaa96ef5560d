//! Historical data collection: storage traits, the collector itself, and the
//! background scheduler that drives it.

mod model;
mod scheduler;
mod service;
mod store;

pub use model::{CollectionMetadata, CollectionStatus};
pub use scheduler::{CollectorScheduler, SchedulerConfig};
pub use service::{CollectionReport, HistoricalCollector};
pub use store::{AttemptRecord, BarStore, MetadataStore, UpsertOutcome};
