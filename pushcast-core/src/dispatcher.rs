//! Broadcast fan-out across all active tokens.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use pushcast_push::{DeliveryGateway, DeliveryOutcome};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{CoreError, Result, TokenRegistry};

/// How a broadcast is carried out.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    /// Feed outcomes back into the registry after each broadcast.
    pub apply_feedback: bool,
    /// Maximum sends in flight at once.
    pub concurrency: usize,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            apply_feedback: true,
            concurrency: 32,
        }
    }
}

/// Outcomes of one broadcast, split by result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub successes: Vec<DeliveryOutcome>,
    pub failures: Vec<DeliveryOutcome>,
}

impl BroadcastReport {
    fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let (successes, failures) = outcomes.into_iter().partition(DeliveryOutcome::is_success);
        Self { successes, failures }
    }

    /// Number of delivered messages.
    pub fn sent(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deliveries.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Destinations attempted.
    pub fn attempted(&self) -> usize {
        self.sent() + self.failed()
    }

    /// Every outcome, successes first.
    pub fn outcomes(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.successes.iter().chain(self.failures.iter())
    }
}

/// Sends one notification to every active token.
pub struct BroadcastDispatcher {
    registry: Arc<TokenRegistry>,
    gateway: Arc<DeliveryGateway>,
    policy: DispatchPolicy,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<TokenRegistry>, gateway: Arc<DeliveryGateway>, policy: DispatchPolicy) -> Self {
        Self {
            registry,
            gateway,
            policy,
        }
    }

    /// Broadcast a title and body with no extra data.
    pub async fn broadcast(&self, title: &str, body: &str) -> Result<BroadcastReport> {
        self.broadcast_with_data(title, body, None).await
    }

    /// Broadcast to the active set as of the call.
    ///
    /// Each active token receives exactly one attempt. Fails with
    /// [`CoreError::NoRecipients`] before any send when nothing is active.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn broadcast_with_data(
        &self,
        title: &str,
        body: &str,
        data: Option<&HashMap<String, String>>,
    ) -> Result<BroadcastReport> {
        let tokens = self.registry.list_active();
        if tokens.is_empty() {
            return Err(CoreError::NoRecipients);
        }

        info!(recipients = tokens.len(), "Broadcasting notification");

        let gateway = &self.gateway;
        let outcomes: Vec<DeliveryOutcome> = stream::iter(tokens)
            .map(|token| async move { gateway.send(&token, title, body, data).await })
            .buffer_unordered(self.policy.concurrency.max(1))
            .collect()
            .await;

        if self.policy.apply_feedback {
            self.registry.record_results(&outcomes);
        }

        let report = BroadcastReport::from_outcomes(outcomes);
        info!(sent = report.sent(), failed = report.failed(), "Broadcast complete");

        Ok(report)
    }
}
