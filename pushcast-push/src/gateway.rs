//! Delivery gateway: one message, one destination, one outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::{DeliveryOutcome, Notification, PushError, PushProvider};

/// Data key carrying the server-side send time.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Data key carrying the provider tag.
pub const SERVER_KEY: &str = "server";

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Value stored under [`SERVER_KEY`] in every payload.
    pub provider_tag: String,
    /// Upper bound on a single provider call.
    pub send_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider_tag: "pushcast-fcm".to_string(),
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// Wraps a [`PushProvider`] and turns every result, including errors and
/// timeouts, into a [`DeliveryOutcome`].
pub struct DeliveryGateway {
    provider: Arc<dyn PushProvider>,
    config: GatewayConfig,
}

impl DeliveryGateway {
    /// Create a gateway over `provider`.
    pub fn new(provider: Arc<dyn PushProvider>, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    /// Send one notification to `token`.
    ///
    /// `data` is copied and extended with the send timestamp and the
    /// provider tag before delivery. This never fails: provider errors come
    /// back as failed outcomes.
    pub async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: Option<&HashMap<String, String>>,
    ) -> DeliveryOutcome {
        let notification = Notification::new(title, body)
            .extend_data(data.into_iter().flatten().map(|(k, v)| (k.as_str(), v.as_str())))
            .data(TIMESTAMP_KEY, chrono::Utc::now().to_rfc3339())
            .data(SERVER_KEY, self.config.provider_tag.as_str());

        let result = tokio::time::timeout(
            self.config.send_timeout,
            self.provider.send(token, &notification),
        )
        .await
        .unwrap_or(Err(PushError::Timeout));

        let redacted = pushcast_log::redact(token);
        match result {
            Ok(message_id) => {
                info!(token = %redacted, provider = self.provider.name(), "Message sent successfully");
                DeliveryOutcome::delivered(token, message_id)
            }
            Err(err) => {
                warn!(
                    token = %redacted,
                    provider = self.provider.name(),
                    kind = %err.failure_kind(),
                    error = %err,
                    "Failed to send message"
                );
                DeliveryOutcome::from_error(token, &err)
            }
        }
    }
}
