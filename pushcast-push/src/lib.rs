//! # Pushcast Push
//!
//! The delivery side of pushcast: a notification model, the [`PushProvider`]
//! transport trait with a Firebase Cloud Messaging implementation, and the
//! [`DeliveryGateway`] that turns each send into a [`DeliveryOutcome`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pushcast_push::{DeliveryGateway, FcmConfig, FcmProvider, GatewayConfig};
//!
//! let config = FcmConfig::from_service_account("serviceAccountKey.json")?;
//! let provider = FcmProvider::new(config)?;
//! let gateway = DeliveryGateway::new(Arc::new(provider), GatewayConfig::default());
//!
//! let outcome = gateway.send("device-token", "New Message", "You have a new message!", None).await;
//! if !outcome.is_success() {
//!     eprintln!("{:?}", outcome.failure_kind());
//! }
//! ```

mod error;
mod fcm;
mod gateway;
mod notification;
mod outcome;
mod provider;

pub use error::{PushError, Result};
pub use fcm::{FcmAuth, FcmConfig, FcmCredentials, FcmProvider};
pub use gateway::{DeliveryGateway, GatewayConfig, SERVER_KEY, TIMESTAMP_KEY};
pub use notification::{Notification, Priority};
pub use outcome::{DeliveryOutcome, DeliveryStatus, FailureKind};
pub use provider::PushProvider;
