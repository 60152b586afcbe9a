//! IPM Controller
//!
//! Reconciles `IpmTransportCapacity` resources against the IPM optical
//! transport management API: creates the transport capacity once its
//! xr-network is usable, keeps name, labels and endpoint capacities in sync,
//! and deletes it when the resource is removed.

mod backoff;
mod config;
mod controller;
mod error;
mod poller;
mod reconcile_helpers;
mod reconciler;
mod watcher;

#[cfg(test)]
mod reconcile_helpers_test;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting IPM Controller");

    // Load configuration from environment variables
    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  IPM URL: {}", config.ipm_url);
    info!("  Namespace: {}", config.namespace);
    info!("  Poll interval: {:?}", config.timings.poll_interval);
    if config.insecure_tls {
        info!("  TLS verification: disabled");
    }

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
