//! Kubernetes resource watcher.
//!
//! Runs a `kube_runtime::Controller` over `IpmTransportCapacity` resources.
//! Each reconcile goes through the finalizer so the IPM object is deleted
//! before the resource is released.

use crate::error::ControllerError;
use crate::reconciler::apply::FINALIZER;
use crate::reconciler::Reconciler;
use crds::IpmTransportCapacity;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::finalizer::{finalizer, Error as FinalizerError, Event};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile
pub struct Context {
    pub reconciler: Arc<Reconciler>,
    pub api: Api<IpmTransportCapacity>,
    /// Cancelled on shutdown; each reconcile runs under a child token
    pub cancel: CancellationToken,
}

/// Watch `IpmTransportCapacity` resources until the context is cancelled.
pub async fn watch_transport_capacities(ctx: Arc<Context>) -> Result<(), ControllerError> {
    info!("Starting IpmTransportCapacity watcher");

    // Debounce batches bursts of events; status patches would otherwise
    // re-trigger reconciles back to back
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    let shutdown = ctx.cancel.clone().cancelled_owned();

    Controller::new(ctx.api.clone(), watcher::Config::default())
        .with_config(controller_config)
        .graceful_shutdown_on(shutdown)
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!("Reconciled {}: {:?}", obj, action),
                Err(e) => error!("Controller error for IpmTransportCapacity: {}", e),
            }
        })
        .await;

    info!("IpmTransportCapacity watcher stopped");
    Ok(())
}

async fn reconcile(
    resource: Arc<IpmTransportCapacity>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    debug!(
        "Reconciling IpmTransportCapacity {}/{}",
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    );

    let cancel = ctx.cancel.child_token();
    let (reconciler, api, cancel) = (&ctx.reconciler, &ctx.api, &cancel);

    finalizer(api, FINALIZER, resource, |event| async move {
        match event {
            Event::Apply(resource) => {
                reconciler
                    .reconcile_transport_capacity(api, &resource, cancel)
                    .await
            }
            Event::Cleanup(resource) => reconciler.cleanup_transport_capacity(&resource, cancel).await,
        }
    })
    .await
    .map_err(|e| match e {
        FinalizerError::ApplyFailed(e) | FinalizerError::CleanupFailed(e) => e,
        other => ControllerError::Finalizer(other.to_string()),
    })
}

/// Error policy: requeue with Fibonacci backoff per resource
fn error_policy(
    resource: Arc<IpmTransportCapacity>,
    error: &ControllerError,
    ctx: Arc<Context>,
) -> Action {
    let key = format!(
        "{}/{}",
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    );

    if matches!(error, ControllerError::Cancelled) {
        return Action::await_change();
    }

    ctx.reconciler.increment_error(&key);
    let (backoff_secs, error_count) = ctx.reconciler.get_backoff_for_resource(&key);
    warn!(
        "Reconciliation error for IpmTransportCapacity {} (attempt {}), retrying in {}s: {}",
        key, error_count, backoff_secs, error
    );
    Action::requeue(Duration::from_secs(backoff_secs))
}
