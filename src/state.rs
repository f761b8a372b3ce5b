//! Shared services handed to every request handler.

use std::sync::Arc;

use pushcast_config::ServerConfig;
use pushcast_core::{BroadcastDispatcher, DispatchPolicy, TokenRegistry};
use pushcast_push::{DeliveryGateway, GatewayConfig, PushProvider};

/// Registry and dispatcher, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TokenRegistry>,
    pub dispatcher: Arc<BroadcastDispatcher>,
}

impl AppState {
    pub fn new(registry: Arc<TokenRegistry>, dispatcher: Arc<BroadcastDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Wire the registry, gateway and dispatcher for `provider` using the
    /// limits in `config`.
    pub fn from_config(config: &ServerConfig, provider: Arc<dyn PushProvider>) -> Self {
        let registry = Arc::new(TokenRegistry::new(config.max_tokens));
        let gateway = Arc::new(DeliveryGateway::new(
            provider,
            GatewayConfig {
                provider_tag: config.provider_tag.clone(),
                send_timeout: config.send_timeout,
            },
        ));
        let dispatcher = Arc::new(BroadcastDispatcher::new(
            registry.clone(),
            gateway,
            DispatchPolicy {
                apply_feedback: config.apply_feedback,
                concurrency: config.send_concurrency,
            },
        ));
        Self::new(registry, dispatcher)
    }
}
