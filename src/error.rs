//! HTTP error mapping.

use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pushcast_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers.
///
/// Every variant renders as `{"success": false, "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed request: 400.
    #[error("{0}")]
    BadRequest(String),
    /// Unregister of a token that is not registered: 404.
    #[error("User not found or already unregistered")]
    TokenNotFound,
    /// No route matched: 404.
    #[error("Not found")]
    RouteNotFound,
    /// Broadcast with nothing to send to: 400.
    #[error("No active tokens to send to")]
    NoRecipients,
    /// Anything unexpected: 500. The detail is logged, not returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::NoRecipients => StatusCode::BAD_REQUEST,
            Self::TokenNotFound | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(message) => Self::BadRequest(message),
            CoreError::NotFound(_) => Self::TokenNotFound,
            CoreError::NoRecipients => Self::NoRecipients,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            Self::TokenNotFound => json!({
                "success": false,
                "error": message,
                "message": "Token not found in database",
            }),
            Self::Internal(detail) => {
                error!(error = %detail, "Internal server error");
                json!({ "success": false, "error": message })
            }
            _ => json!({ "success": false, "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

/// Turn a handler panic into the generic 500 body.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(detail).into_response()
}
