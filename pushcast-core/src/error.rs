//! Core error types.

use thiserror::Error;

/// Result type for registry and dispatcher operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures of registry and dispatcher operations.
///
/// Per-destination delivery failures are not errors; they are
/// [`DeliveryOutcome`](pushcast_push::DeliveryOutcome) values inside a report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Bad identifier or request shape.
    #[error("{0}")]
    InvalidInput(String),

    /// The identifier is not registered.
    #[error("Token not found: {0}")]
    NotFound(String),

    /// Broadcast requested with no active tokens.
    #[error("No active tokens to send to")]
    NoRecipients,
}
