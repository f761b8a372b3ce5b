//! End-to-end tests for the HTTP API against an in-memory provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use parking_lot::Mutex;
use pushcast::{AppState, DEFAULT_BODY, DEFAULT_TITLE, router};
use pushcast_config::{DEFAULT_CORS_ORIGINS, ServerConfig};
use pushcast_push::{Notification, PushError, PushProvider};
use serde_json::{Value, json};
use tower::ServiceExt;

// =============================================================================
// Test Provider
// =============================================================================

#[derive(Default)]
struct ScriptedProvider {
    unregistered: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, Notification)>>,
}

impl ScriptedProvider {
    fn reject(&self, token: &str) {
        self.unregistered.lock().push(token.to_string());
    }

    fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PushProvider for ScriptedProvider {
    async fn send(&self, token: &str, notification: &Notification) -> pushcast_push::Result<String> {
        self.sent.lock().push((token.to_string(), notification.clone()));
        if self.unregistered.lock().iter().any(|t| t == token) {
            return Err(PushError::Unregistered("Requested entity was not found.".into()));
        }
        Ok(format!("projects/test/messages/{}", self.sent.lock().len()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct TestApp {
    router: Router,
    provider: Arc<ScriptedProvider>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    fn with_config(config: ServerConfig) -> Self {
        let provider = Arc::new(ScriptedProvider::default());
        let state = AppState::from_config(&config, provider.clone());
        Self {
            router: router(state, &config.cors_origins),
            provider,
        }
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Request::get(path).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(path, body.to_string()).await
    }

    async fn post_raw(&self, path: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();
        self.request(request).await
    }

    async fn register(&self, token: &str) -> (StatusCode, Value) {
        self.post("/register", json!({ "token": token })).await
    }
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn test_status_reports_counts() {
    let app = TestApp::new();
    app.register("tok-A").await;

    let (status, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pushcast server running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["registered_tokens"], 1);
    assert_eq!(body["active_tokens"], 1);
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

// =============================================================================
// Register / Unregister
// =============================================================================

#[tokio::test]
async fn test_register_new_then_update() {
    let app = TestApp::new();

    let (status, first) = app.register("tok-A").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        first,
        json!({ "success": true, "message": "New token registered", "total_tokens": 1 })
    );

    let (status, second) = app.register("tok-A").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        second,
        json!({ "success": true, "message": "Token updated", "total_tokens": 1 })
    );
}

#[tokio::test]
async fn test_register_rejects_bad_bodies() {
    let app = TestApp::new();

    let cases: [(&str, &str); 6] = [
        ("", "No JSON data provided"),
        ("not json", "No JSON data provided"),
        ("{}", "No JSON data provided"),
        (r#"{"device":"x"}"#, "No token provided"),
        (r#"{"token":""}"#, "No token provided"),
        (r#"{"token":123}"#, "Invalid token provided"),
    ];

    for (raw, error) in cases {
        let (status, body) = app.post_raw("/register", raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{raw}");
        assert_eq!(body, json!({ "success": false, "error": error }), "{raw}");
    }

    let (_, stats) = app.get("/stats").await;
    assert_eq!(stats["stats"]["total_tokens"], 0);
}

#[tokio::test]
async fn test_unregister() {
    let app = TestApp::new();
    app.register("tok-A").await;
    app.register("tok-B").await;

    let (status, body) = app.post("/unregister", json!({ "token": "tok-A" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "message": "Token unregistered successfully", "total_tokens": 1 })
    );

    let (status, body) = app.post("/unregister", json!({ "token": "tok-A" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "User not found or already unregistered",
            "message": "Token not found in database",
        })
    );
}

#[tokio::test]
async fn test_unregister_validates_body() {
    let app = TestApp::new();

    let (status, body) = app.post("/unregister", json!({ "token": false })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid token provided");
}

// =============================================================================
// Send
// =============================================================================

#[tokio::test]
async fn test_send_with_no_tokens() {
    let app = TestApp::new();

    let (status, body) = app.post("/send", json!({ "title": "Hi" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "error": "No active tokens to send to" }));
    assert!(app.provider.sent().is_empty());
}

#[tokio::test]
async fn test_send_requires_json_object() {
    let app = TestApp::new();
    app.register("tok-A").await;

    let (status, body) = app.post_raw("/send", "title=Hi").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No JSON data provided");
}

#[tokio::test]
async fn test_send_rejects_empty_object() {
    let app = TestApp::new();
    app.register("tok-A").await;

    let (status, body) = app.post("/send", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "error": "No JSON data provided" }));
    assert!(app.provider.sent().is_empty());
}

#[tokio::test]
async fn test_send_uses_defaults_and_payload_tags() {
    let app = TestApp::new();
    app.register("tok-A").await;

    let (status, body) = app.post("/send", json!({ "data": { "kind": "ping" } })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 1);

    let (token, notification) = &app.provider.sent()[0];
    assert_eq!(token, "tok-A");
    assert_eq!(notification.title, DEFAULT_TITLE);
    assert_eq!(notification.body, DEFAULT_BODY);
    assert_eq!(notification.data["server"], "pushcast-fcm");
    assert!(notification.data.contains_key("timestamp"));
}

#[tokio::test]
async fn test_send_forwards_custom_data() {
    let app = TestApp::new();
    app.register("tok-A").await;

    app.post(
        "/send",
        json!({ "title": "Sale", "body": "50% off", "data": { "url": "/deals", "count": 2 } }),
    )
    .await;

    let (_, notification) = &app.provider.sent()[0];
    let expected: HashMap<&str, &str> = HashMap::from([("url", "/deals"), ("count", "2")]);
    for (key, value) in expected {
        assert_eq!(notification.data[key], value);
    }
}

#[tokio::test]
async fn test_send_reports_failures_and_deactivates() {
    let app = TestApp::new();
    app.register("good").await;
    app.register("stale").await;
    app.provider.reject("stale");

    let (status, body) = app.post("/send", json!({ "title": "Hi", "body": "Body" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["message"], "Broadcast sent to 1 devices");

    let success = &body["details"]["successes"][0];
    assert_eq!(success["success"], true);
    assert_eq!(success["token"], "good");
    assert!(success["response"].as_str().unwrap().starts_with("projects/test/messages/"));

    let failure = &body["details"]["failures"][0];
    assert_eq!(
        failure,
        &json!({
            "success": false,
            "error": "Token not registered",
            "token": "stale",
            "error_code": "UNREGISTERED",
        })
    );

    let (_, stats) = app.get("/stats").await;
    assert_eq!(
        stats["stats"],
        json!({
            "total_tokens": 2,
            "active_tokens": 1,
            "inactive_tokens": 1,
            "total_successful_sends": 1,
            "total_failed_sends": 1,
        })
    );

    // Only the active token is attempted next time.
    app.post("/send", json!({ "title": "Hi" })).await;
    assert_eq!(app.provider.sent().len(), 3);
    assert_eq!(app.provider.sent()[2].0, "good");
}

#[tokio::test]
async fn test_send_without_feedback_keeps_counters() {
    let config = ServerConfig {
        apply_feedback: false,
        ..ServerConfig::default()
    };
    let app = TestApp::with_config(config);
    app.register("stale").await;
    app.provider.reject("stale");

    let (_, body) = app.post("/send", json!({ "title": "Hi" })).await;
    assert_eq!(body["failed"], 1);

    let (_, stats) = app.get("/stats").await;
    assert_eq!(stats["stats"]["active_tokens"], 1);
    assert_eq!(stats["stats"]["total_failed_sends"], 0);
}

#[tokio::test]
async fn test_reregistration_reactivates() {
    let app = TestApp::new();
    app.register("stale").await;
    app.provider.reject("stale");
    app.post("/send", json!({ "title": "Hi" })).await;

    let (status, _) = app.post("/send", json!({ "title": "Hi" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.register("stale").await;
    assert_eq!(body["message"], "Token updated");

    let (_, stats) = app.get("/stats").await;
    assert_eq!(stats["stats"]["active_tokens"], 1);
}

/// Register tok-A twice, miss on tok-B, then broadcast to tok-A.
#[tokio::test]
async fn test_register_unregister_broadcast_scenario() {
    let app = TestApp::new();

    app.register("tok-A").await;
    let (_, second) = app.register("tok-A").await;
    assert_eq!(second["message"], "Token updated");
    assert_eq!(second["total_tokens"], 1);

    let (status, _) = app.post("/unregister", json!({ "token": "tok-B" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = app.post("/send", json!({ "title": "Hi", "body": "Body" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sent"], 1);
    assert_eq!(report["failed"], 0);
}

// =============================================================================
// Tokens / Stats
// =============================================================================

#[tokio::test]
async fn test_tokens_listing_hides_raw_tokens() {
    let app = TestApp::new();
    app.register("very-secret-device-token-1").await;
    app.register("very-secret-device-token-2").await;
    app.post("/send", json!({ "title": "Hi" })).await;

    let (status, body) = app.get("/tokens").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["total_tokens"], 2);

    let tokens = body["tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0]["id"], "token_1");
    assert_eq!(tokens[1]["id"], "token_2");
    for token in tokens {
        assert_eq!(token["successful_sends"], 1);
        assert_eq!(token["failed_sends"], 0);
        assert_eq!(token["is_active"], true);
        assert!(token["registered_at"].is_string());
        assert!(token["last_active"].is_string());
    }
    assert!(!body.to_string().contains("very-secret"));
}

#[tokio::test]
async fn test_capacity_eviction_over_http() {
    let config = ServerConfig {
        max_tokens: 2,
        ..ServerConfig::default()
    };
    let app = TestApp::with_config(config);
    app.register("a").await;
    app.register("b").await;
    app.provider.reject("a");
    app.provider.reject("b");
    app.post("/send", json!({ "title": "Hi" })).await;

    let (_, body) = app.register("c").await;

    assert_eq!(body["message"], "New token registered");
    assert_eq!(body["total_tokens"], 1);
}

// =============================================================================
// Routing / CORS
// =============================================================================

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();

    let (status, body) = app.get("/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "Not found" }));
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let app = TestApp::new();
    let origin = DEFAULT_CORS_ORIGINS[0];

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/register")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], origin);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let app = TestApp::new();

    let request = Request::get("/stats")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_slow_provider_times_out_as_failure() {
    struct Hanging;

    #[async_trait]
    impl PushProvider for Hanging {
        async fn send(&self, _token: &str, _n: &Notification) -> pushcast_push::Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".into())
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    let config = ServerConfig {
        send_timeout: Duration::from_millis(50),
        ..ServerConfig::default()
    };
    let app = router(AppState::from_config(&config, Arc::new(Hanging)), &config.cors_origins);

    let register = Request::post("/register")
        .body(Body::from(r#"{"token":"tok"}"#))
        .unwrap();
    app.clone().oneshot(register).await.unwrap();

    let send = Request::post("/send").body(Body::from(r#"{"title":"Hi"}"#)).unwrap();
    let response = app.oneshot(send).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["failed"], 1);
    assert_eq!(body["details"]["failures"][0]["error_code"], "UNKNOWN");
}
