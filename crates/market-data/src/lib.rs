//! Provider adapters and fallback resolution for market data.
//!
//! This crate owns everything that talks to upstream vendors:
//!
//! - Canonical models every adapter normalizes into ([`models`])
//! - The [`provider::MarketDataProvider`] trait and the concrete adapters
//!   (Twelve Data, Finnhub, Alpha Vantage, and the synthesis fallback)
//! - The [`resolver::FallbackResolver`] that walks the ranked chain and
//!   produces either a canonical value or a terminal
//!   [`errors::ResolutionError`]
//!
//! Caching, persistence, and scheduling live elsewhere; callers hand the
//! resolver a symbol and get back data tagged with its source.

pub mod errors;
pub mod models;
pub mod provider;
pub mod resolver;

pub use errors::{FailureKind, ProviderError, ResolutionError};
pub use models::{
    AttemptOutcome, DataClass, DataSource, Fundamentals, HistoricalBar, HistoricalPeriod,
    ProviderAttempt, Quote,
};
pub use provider::{
    AlphaVantageProvider, FinnhubProvider, MarketDataProvider, SyntheticProvider,
    TwelveDataProvider,
};
pub use resolver::{FallbackResolver, Resolved};
