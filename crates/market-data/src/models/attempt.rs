use std::time::Duration;

use crate::errors::FailureKind;

/// Outcome of a single provider attempt during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed(FailureKind),
    /// The adapter did not answer within the resolver's per-adapter deadline.
    TimedOut,
}

/// One entry in the resolver's attempt log.
///
/// The log is attached to terminal failures and to resolved values, so
/// operators can see which providers were consulted and why each was skipped.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: &'static str,
    pub outcome: AttemptOutcome,
    pub latency: Duration,
}

impl ProviderAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }
}
