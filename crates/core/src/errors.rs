//! Error types for the core subsystem.

use stockpulse_market_data::{DataClass, ResolutionError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core services.
///
/// `Unavailable` is the only terminal data error collaborators see: it means
/// every provider failed and no cached value of any age exists.
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(String),

    #[error("no data available for {ticker} ({class})")]
    Unavailable { ticker: String, class: DataClass },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("request for {ticker} timed out")]
    Timeout { ticker: String },
}

impl Error {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn unavailable(ticker: impl Into<String>, class: DataClass) -> Self {
        Self::Unavailable {
            ticker: ticker.into(),
            class,
        }
    }
}
