//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the IPM client,
//! the reconciler and the `IpmTransportCapacity` watcher together and runs
//! them until shutdown.

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{watch_transport_capacities, Context};
use crds::IpmTransportCapacity;
use ipm_client::{Credentials, IpmClient};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main controller for IPM transport capacities.
pub struct Controller {
    transport_capacity_watcher: JoinHandle<Result<(), ControllerError>>,
    cancel: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing IPM Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        // Create IPM client
        let ipm_client = IpmClient::new(
            config.ipm_url.clone(),
            config.credentials.clone(),
            config.insecure_tls,
        )?;

        // Validate credentials and connectivity before proceeding
        info!("Validating IPM credentials and connectivity...");
        ipm_client.validate().await.map_err(|e| {
            error!("Failed to validate IPM credentials: {}", e);
            error!("Please ensure:");
            match &config.credentials {
                Credentials::Token(_) => error!("  1. IPM_TOKEN is set to a valid bearer token"),
                Credentials::Password { .. } => {
                    error!("  1. IPM_USERNAME and IPM_PASSWORD are set correctly")
                }
            }
            error!("  2. IPM is reachable at {}", config.ipm_url);
            if !config.insecure_tls {
                error!("  3. The IPM certificate is trusted, or IPM_INSECURE_TLS=true for lab setups");
            }
            ControllerError::from(e)
        })?;
        info!("IPM credentials validated and connectivity established");

        let api: Api<IpmTransportCapacity> = Api::namespaced(kube_client, &config.namespace);
        let reconciler = Arc::new(Reconciler::new(ipm_client, config.timings.clone()));
        let cancel = CancellationToken::new();

        let ctx = Arc::new(Context {
            reconciler,
            api,
            cancel: cancel.clone(),
        });

        // Start the watcher in a background task
        let transport_capacity_watcher =
            tokio::spawn(async move { watch_transport_capacities(ctx).await });

        Ok(Self {
            transport_capacity_watcher,
            cancel,
        })
    }

    /// Runs the controller until the watcher exits or a shutdown signal arrives.
    ///
    /// On shutdown the cancellation token is fired, in-flight reconciles stop
    /// at their next wait or request, and the watcher drains before returning.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("IPM Controller running");

        tokio::select! {
            result = &mut self.transport_capacity_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("IpmTransportCapacity watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("IpmTransportCapacity watcher error: {}", e)))?;
                return Ok(());
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown requested, cancelling in-flight reconciles");
            }
        }

        self.cancel.cancel();
        self.transport_capacity_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("IpmTransportCapacity watcher panicked: {}", e)))??;

        info!("IPM Controller stopped");
        Ok(())
    }
}
