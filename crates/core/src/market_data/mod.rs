//! The read contract: freshness policy, batch orchestration, and the
//! service collaborators call.

pub mod batch;
pub mod freshness;
mod model;
mod service;

pub use batch::BatchConfig;
pub use freshness::FreshnessEvaluator;
pub use model::{FundamentalsResponse, HistoryResponse, QuoteResponse};
pub use service::MarketDataService;
