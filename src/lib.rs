//! Pushcast HTTP service.
//!
//! Accepts device tokens over a small JSON API, keeps them in a
//! [`TokenRegistry`](pushcast_core::TokenRegistry), and broadcasts
//! notifications to every active token through FCM.
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /` | liveness and token counts |
//! | `POST /register` | add or refresh a token |
//! | `POST /unregister` | remove a token |
//! | `POST /send` | broadcast to all active tokens |
//! | `GET /tokens` | per-token metadata, tokens redacted |
//! | `GET /stats` | aggregate counts |

mod error;
mod handlers;
mod middleware;
mod shutdown;
mod state;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::warn;

pub use error::ApiError;
pub use handlers::{DEFAULT_BODY, DEFAULT_TITLE};
pub use shutdown::shutdown_on;
pub use state::AppState;

/// Build the application router.
///
/// `cors_origins` are the exact origins allowed to make credentialed
/// cross-origin requests; entries that are not valid header values are
/// skipped with a warning.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::status))
        .route("/register", post(handlers::register))
        .route("/unregister", post(handlers::unregister))
        .route("/send", post(handlers::send))
        .route("/tokens", get(handlers::tokens))
        .route("/stats", get(handlers::stats))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(cors_layer(cors_origins))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
