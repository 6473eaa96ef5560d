use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the most recent collection attempt for a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// Tracked but never attempted.
    Pending,
    Success,
    Failed,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Pending => "pending",
            CollectionStatus::Success => "success",
            CollectionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> CollectionStatus {
        match s {
            "success" => CollectionStatus::Success,
            "failed" => CollectionStatus::Failed,
            _ => CollectionStatus::Pending,
        }
    }
}

/// Per-ticker collection bookkeeping. One row per tracked ticker, created on
/// first reference and deactivated rather than deleted after repeated
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub ticker: String,
    pub priority: i32,
    pub status: CollectionStatus,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub last_succeeded_at: Option<DateTime<Utc>>,
    pub consecutive_failures: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionMetadata {
    pub fn new(ticker: impl Into<String>, priority: i32, now: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.into(),
            priority,
            status: CollectionStatus::Pending,
            last_attempted_at: None,
            last_succeeded_at: None,
            consecutive_failures: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
