//! Canonical market data models.
//!
//! Every provider adapter normalizes its vendor-specific payload into these
//! types at the adapter boundary. Nothing vendor-shaped crosses this module.

mod attempt;
mod bar;
mod data_class;
mod fundamentals;
mod quote;

pub use attempt::{AttemptOutcome, ProviderAttempt};
pub use bar::{HistoricalBar, HistoricalPeriod};
pub use data_class::DataClass;
pub use fundamentals::Fundamentals;
pub use quote::{DataSource, Quote};
