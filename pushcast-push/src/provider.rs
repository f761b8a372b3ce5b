//! Push provider trait.

use async_trait::async_trait;

use crate::{Notification, Result};

/// A transport that delivers one notification to one destination token.
///
/// Implementations report provider failures as [`PushError`](crate::PushError);
/// converting them into outcome data is the [`DeliveryGateway`](crate::DeliveryGateway)'s job.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Send a notification to a device token, returning the provider message id.
    async fn send(&self, token: &str, notification: &Notification) -> Result<String>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}
