//! Token records and registry statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle metadata for one registered destination token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Set once at first registration.
    pub registered_at: DateTime<Utc>,
    /// Refreshed on re-registration and on successful delivery.
    pub last_active: DateTime<Utc>,
    pub successful_sends: u64,
    pub failed_sends: u64,
    /// False once a terminal delivery failure has been observed.
    pub is_active: bool,
    /// Insertion order, used for positional ids in snapshots.
    pub(crate) seq: u64,
}

impl TokenRecord {
    pub(crate) fn new(now: DateTime<Utc>, seq: u64) -> Self {
        Self {
            registered_at: now,
            last_active: now,
            successful_sends: 0,
            failed_sends: 0,
            is_active: true,
            seq,
        }
    }

    /// Total delivery attempts recorded against this token.
    pub fn total_sends(&self) -> u64 {
        self.successful_sends + self.failed_sends
    }
}

/// Externally visible view of a record; the token itself is replaced by a
/// positional id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub id: String,
    pub registered_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub successful_sends: u64,
    pub failed_sends: u64,
    pub is_active: bool,
}

/// Aggregate counts over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    #[serde(rename = "total_tokens")]
    pub total: usize,
    #[serde(rename = "active_tokens")]
    pub active: usize,
    #[serde(rename = "inactive_tokens")]
    pub inactive: usize,
    #[serde(rename = "total_successful_sends")]
    pub total_success: u64,
    #[serde(rename = "total_failed_sends")]
    pub total_failure: u64,
}

/// Result of a successful `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// False when the token was already known and only refreshed.
    pub is_new: bool,
    /// Registry size after the call.
    pub total_count: usize,
}
