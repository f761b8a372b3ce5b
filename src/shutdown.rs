//! Graceful shutdown trigger.

use std::future::Future;
use std::io;

use tracing::{error, info};

/// Resolves once `signal` reports a shutdown request.
///
/// If the listener itself fails the server keeps running: this future then
/// never resolves, so only an explicit signal stops the process.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown requested"),
        Err(err) => {
            error!(error = %err, "Failed to listen for shutdown signal; continuing without graceful shutdown");
            std::future::pending::<()>().await;
        }
    }
}
