//! Request handlers.
//!
//! Bodies are read as raw bytes and parsed here so that malformed input gets
//! the same JSON error shape as every other failure.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::{Map, Value, json};
use tracing::info;

use pushcast_core::CoreError;

use crate::{ApiError, AppState};

/// Title used when `/send` omits one.
pub const DEFAULT_TITLE: &str = "Pushcast Notification";
/// Body used when `/send` omits one.
pub const DEFAULT_BODY: &str = "This is a test message from the pushcast server.";

type ApiResult = Result<Json<Value>, ApiError>;

/// `GET /`
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let stats = state.registry.stats();
    Json(json!({
        "status": "pushcast server running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "registered_tokens": stats.total,
        "active_tokens": stats.active,
    }))
}

/// `POST /register`
pub async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let body = non_empty_object(&body)?;
    let token = token_field(&body)?;

    let registration = state.registry.register(token)?;
    let message = if registration.is_new {
        "New token registered"
    } else {
        "Token updated"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "total_tokens": registration.total_count,
    })))
}

/// `POST /unregister`
pub async fn unregister(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let body = non_empty_object(&body)?;
    let token = token_field(&body)?;

    if !state.registry.unregister(token) {
        return Err(CoreError::NotFound(pushcast_log::redact(token)).into());
    }

    Ok(Json(json!({
        "success": true,
        "message": "Token unregistered successfully",
        "total_tokens": state.registry.len(),
    })))
}

/// `POST /send`
pub async fn send(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let body = non_empty_object(&body)?;
    let title = text_field(&body, "title", DEFAULT_TITLE)?;
    let text = text_field(&body, "body", DEFAULT_BODY)?;
    let data = data_field(&body)?;

    info!(title = %title, "Broadcast requested");

    let report = state
        .dispatcher
        .broadcast_with_data(title, text, data.as_ref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "sent": report.sent(),
        "failed": report.failed(),
        "message": format!("Broadcast sent to {} devices", report.sent()),
        "details": report,
    })))
}

/// `GET /tokens`
pub async fn tokens(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "stats": state.registry.stats(),
        "tokens": state.registry.snapshot(),
    }))
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "stats": state.registry.stats(),
    }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

fn object(bytes: &Bytes) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::bad_request("No JSON data provided")),
    }
}

fn non_empty_object(bytes: &Bytes) -> Result<Map<String, Value>, ApiError> {
    let map = object(bytes)?;
    if map.is_empty() {
        return Err(ApiError::bad_request("No JSON data provided"));
    }
    Ok(map)
}

fn token_field(body: &Map<String, Value>) -> Result<&str, ApiError> {
    match body.get("token") {
        None | Some(Value::Null) => Err(ApiError::bad_request("No token provided")),
        Some(Value::String(token)) if token.is_empty() => Err(ApiError::bad_request("No token provided")),
        Some(Value::String(token)) => Ok(token),
        Some(_) => Err(ApiError::bad_request("Invalid token provided")),
    }
}

fn text_field<'a>(body: &'a Map<String, Value>, key: &str, default: &'a str) -> Result<&'a str, ApiError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ApiError::bad_request(format!("Invalid {key} provided"))),
    }
}

/// Provider data payloads are string-to-string; other scalars are stringified.
fn data_field(body: &Map<String, Value>) -> Result<Option<HashMap<String, String>>, ApiError> {
    match body.get("data") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(entries)) => Ok(Some(
            entries
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        )),
        Some(_) => Err(ApiError::bad_request("Invalid data provided")),
    }
}
