//! Token registry and broadcast dispatch.
//!
//! [`TokenRegistry`] owns the set of destination tokens and their delivery
//! history. [`BroadcastDispatcher`] sends one notification to every active
//! token through a [`DeliveryGateway`](pushcast_push::DeliveryGateway) and
//! feeds the outcomes back into the registry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pushcast_core::{BroadcastDispatcher, DispatchPolicy, TokenRegistry};
//! use pushcast_push::{DeliveryGateway, FcmConfig, FcmProvider, GatewayConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(TokenRegistry::new(10_000));
//! let provider = FcmProvider::new(FcmConfig::from_service_account("serviceAccountKey.json")?)?;
//! let gateway = Arc::new(DeliveryGateway::new(Arc::new(provider), GatewayConfig::default()));
//! let dispatcher = BroadcastDispatcher::new(registry.clone(), gateway, DispatchPolicy::default());
//!
//! registry.register("device-token")?;
//! let report = dispatcher.broadcast("Hello", "World").await?;
//! println!("sent {} failed {}", report.sent(), report.failed());
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod error;
mod record;
mod registry;

pub use dispatcher::{BroadcastDispatcher, BroadcastReport, DispatchPolicy};
pub use error::{CoreError, Result};
pub use record::{Registration, RegistryStats, TokenRecord, TokenSummary};
pub use registry::{Clock, TokenRegistry};
