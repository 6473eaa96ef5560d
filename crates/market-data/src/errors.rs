//! Error types and failure classification for provider adapters.
//!
//! Adapter errors never escape the [`FallbackResolver`](crate::resolver::FallbackResolver):
//! the resolver inspects each error's [`FailureKind`] to decide how to continue
//! down the provider chain, and callers only ever see a canonical result or
//! [`ResolutionError::Exhausted`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DataClass, ProviderAttempt};

/// Coarse classification of an adapter failure.
///
/// The resolver branches on this instead of matching individual error
/// variants, so adapters can grow new variants without touching the
/// fallback logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider throttled us (HTTP 429, or a vendor-specific soft limit).
    /// The provider should be left alone for a while, but the next provider
    /// in the chain is tried immediately.
    RateLimited,
    /// Network-level trouble: timeouts, connection resets, 5xx answers.
    /// Worth retrying against the next provider right away.
    Transient,
    /// The vendor positively answered that it cannot serve this request
    /// (unknown symbol, unsupported operation). Retrying the same provider
    /// will not help; the next provider might still know the symbol.
    Permanent,
    /// The response parsed as HTTP but failed schema validation. Treated as a
    /// data-quality permanent failure for this provider.
    Malformed,
}

/// Errors produced by a single provider adapter.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rate limited the request.
    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    /// The request to the provider timed out at the HTTP layer.
    #[error("timeout talking to {provider}")]
    Timeout { provider: String },

    /// The provider answered with a server-side error status.
    #[error("{provider} unavailable (status {status})")]
    Unavailable { provider: String, status: u16 },

    /// A network error occurred while communicating with the provider.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider does not know the requested symbol.
    #[error("{provider} has no data for symbol {symbol}")]
    NotFound { provider: String, symbol: String },

    /// The provider does not support the requested operation.
    #[error("{provider} does not support {operation}")]
    Unsupported { provider: String, operation: String },

    /// The response parsed, but failed canonical schema validation.
    #[error("malformed response from {provider}: {message}")]
    Malformed { provider: String, message: String },
}

impl ProviderError {
    /// Classify this error for the resolver's fallback decision.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Timeout { .. } | Self::Unavailable { .. } => FailureKind::Transient,
            Self::Network(e) => {
                if e.is_timeout() || e.is_connect() {
                    FailureKind::Transient
                } else {
                    FailureKind::Malformed
                }
            }
            Self::NotFound { .. } | Self::Unsupported { .. } => FailureKind::Permanent,
            Self::Malformed { .. } => FailureKind::Malformed,
        }
    }
}

/// Terminal resolver failure: every ranked provider and the synthesis
/// fallback failed. Carries the per-provider attempt log for diagnostics.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("all providers exhausted for {ticker} ({class})")]
    Exhausted {
        ticker: String,
        class: DataClass,
        attempts: Vec<ProviderAttempt>,
    },
}

impl ResolutionError {
    /// The attempt log accumulated during the failed resolution.
    pub fn attempts(&self) -> &[ProviderAttempt] {
        match self {
            Self::Exhausted { attempts, .. } => attempts,
        }
    }
}
