//! Per-destination delivery outcomes.

use serde::{Deserialize, Serialize, Serializer};

use crate::PushError;

/// Classification of a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The provider rejected the message or the token as malformed.
    InvalidArgument,
    /// The destination is no longer valid.
    Unregistered,
    /// Anything else: network, auth, quota, provider outage.
    Unknown,
}

impl FailureKind {
    /// Terminal kinds mark a token inactive until it is re-registered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidArgument | Self::Unregistered)
    }

    /// Wire code, as sent in `error_code`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unregistered => "UNREGISTERED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Accepted by the provider.
    Delivered {
        /// Provider-assigned message identifier.
        message_id: String,
    },
    /// Rejected or not attempted.
    Failed {
        /// Classification used for registry feedback.
        kind: FailureKind,
        /// Human-readable detail.
        error: String,
    },
}

/// Outcome of sending one message to one destination token.
///
/// Serializes as `{"success":true,"response":..,"token":..}` or
/// `{"success":false,"error":..,"token":..,"error_code":..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Destination token.
    pub token: String,
    /// What happened.
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    /// A successful delivery.
    pub fn delivered(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: DeliveryStatus::Delivered {
                message_id: message_id.into(),
            },
        }
    }

    /// A failed delivery.
    pub fn failed(token: impl Into<String>, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: DeliveryStatus::Failed {
                kind,
                error: error.into(),
            },
        }
    }

    /// Convert a provider error into a failed outcome.
    pub fn from_error(token: impl Into<String>, err: &PushError) -> Self {
        let kind = err.failure_kind();
        let error = match kind {
            FailureKind::InvalidArgument => "Invalid message format".to_string(),
            FailureKind::Unregistered => "Token not registered".to_string(),
            FailureKind::Unknown => err.to_string(),
        };
        Self::failed(token, kind, error)
    }

    /// Whether the provider accepted the message.
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered { .. })
    }

    /// Failure classification, if the delivery failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            DeliveryStatus::Delivered { .. } => None,
            DeliveryStatus::Failed { kind, .. } => Some(*kind),
        }
    }
}

impl Serialize for DeliveryOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            success: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            response: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
            token: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            error_code: Option<FailureKind>,
        }

        let wire = match &self.status {
            DeliveryStatus::Delivered { message_id } => Wire {
                success: true,
                response: Some(message_id.as_str()),
                error: None,
                token: &self.token,
                error_code: None,
            },
            DeliveryStatus::Failed { kind, error } => Wire {
                success: false,
                response: None,
                error: Some(error.as_str()),
                token: &self.token,
                error_code: Some(*kind),
            },
        };
        wire.serialize(serializer)
    }
}
