//! Apply and cleanup flow for `IpmTransportCapacity` resources.
//!
//! [`Reconciler::apply_desired`] decides between import, create, update and
//! refresh from the id recorded in status; it knows nothing about
//! Kubernetes. The resource-facing wrappers around it write status and run
//! the finalizer cleanup.

use super::transport_capacity::{change_set, owned_child, Lookup, TransportCapacityDesired};
use super::Reconciler;
use crate::error::ControllerError;
use crate::reconcile_helpers::{
    create_transport_capacity_status_patch, failed_status, observed_status, status_needs_update,
};
use crds::IpmTransportCapacity;
use ipm_client::common::query::expanded;
use ipm_client::TransportCapacity;
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Finalizer guarding the IPM object of an `IpmTransportCapacity`
pub const FINALIZER: &str = "ipm.microscaler.io/transport-capacity";

/// Requeue once IPM reports the capacity configured
const SETTLED_REQUEUE: Duration = Duration::from_secs(300);

/// Outcome of one apply pass
#[derive(Debug, Clone)]
pub struct Applied {
    pub transport_capacity: TransportCapacity,
    pub requeue_after: Duration,
}

impl Reconciler {
    /// Drive IPM toward `desired`.
    ///
    /// Without a recorded id the capacity is first looked up by its endpoints
    /// (when both are module-by-name) so an existing object is adopted rather
    /// than duplicated. A recorded id that IPM no longer knows is recreated.
    pub async fn apply_desired(
        &self,
        desired: &TransportCapacityDesired,
        recorded_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Applied, ControllerError> {
        let current = match recorded_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                let found = self.read(Lookup::Id(id), 1, cancel).await?;
                if found.is_none() {
                    warn!("Transport capacity {} no longer exists in IPM, will recreate", id);
                }
                found
            }
            None => self.import(desired, cancel).await?,
        };

        let Some(current) = current else {
            let created = self.create(desired, cancel).await?;
            return Ok(self.settle(created));
        };

        if !change_set(&current, desired)?.is_empty() {
            let updated = self.update(&current, desired, cancel).await?;
            return Ok(self.settle(updated));
        }

        if current.is_configured() {
            debug!("Transport capacity {} is configured and up to date", current.id);
            return Ok(self.settle(current));
        }

        let query = expanded(&TransportCapacity::path(&current.id));
        match self.poller(cancel).check_resource_state(&query, 1).await {
            Ok(()) => {
                let refreshed = self.read(Lookup::Id(&current.id), 1, cancel).await?;
                Ok(self.settle(refreshed.unwrap_or(current)))
            }
            Err(ControllerError::PreconditionFailed(_)) => {
                info!(
                    "Transport capacity {} is {}, checking again in {:?}",
                    current.id,
                    current.lifecycle_state.as_deref().unwrap_or("unknown"),
                    self.timings.poll_interval
                );
                Ok(self.settle(current))
            }
            Err(e) => Err(e),
        }
    }

    async fn import(
        &self,
        desired: &TransportCapacityDesired,
        cancel: &CancellationToken,
    ) -> Result<Option<TransportCapacity>, ControllerError> {
        if !desired.is_importable() {
            return Ok(None);
        }
        let found = self.read(Lookup::Endpoints(desired), 1, cancel).await?;
        if let Some(tc) = &found {
            info!("Adopting existing transport capacity {} ({})", tc.id, tc.href);
        }
        Ok(found)
    }

    fn settle(&self, transport_capacity: TransportCapacity) -> Applied {
        let requeue_after = if transport_capacity.is_configured() {
            SETTLED_REQUEUE
        } else {
            self.timings.poll_interval
        };
        Applied {
            transport_capacity,
            requeue_after,
        }
    }

    /// Reconcile one `IpmTransportCapacity` and record the outcome in its status.
    ///
    /// A failure is written to `status.error` before it is returned, except
    /// for cancellation, which leaves status untouched. A recorded id
    /// survives the failure.
    pub async fn reconcile_transport_capacity(
        &self,
        api: &Api<IpmTransportCapacity>,
        resource: &IpmTransportCapacity,
        cancel: &CancellationToken,
    ) -> Result<Action, ControllerError> {
        let name = resource.name_any();
        let key = format!("{}/{}", resource.namespace().unwrap_or_default(), name);
        let recorded_id = resource.status.as_ref().and_then(|s| s.id.as_deref());

        let outcome = match TransportCapacityDesired::try_from(&resource.spec) {
            Ok(desired) => self.apply_desired(&desired, recorded_id, cancel).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(applied) => {
                let status = observed_status(&applied.transport_capacity);
                if status_needs_update(resource.status.as_ref(), &status) {
                    let patch = create_transport_capacity_status_patch(&status);
                    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
                        .await?;
                    info!(
                        "IpmTransportCapacity {} -> {} ({})",
                        key,
                        applied.transport_capacity.id,
                        applied
                            .transport_capacity
                            .lifecycle_state
                            .as_deref()
                            .unwrap_or("unknown")
                    );
                } else {
                    debug!("IpmTransportCapacity {} status unchanged", key);
                }
                self.reset_error(&key);
                Ok(Action::requeue(applied.requeue_after))
            }
            Err(ControllerError::Cancelled) => {
                info!("Reconcile of IpmTransportCapacity {} cancelled", key);
                Err(ControllerError::Cancelled)
            }
            Err(e) => {
                error!("Failed to reconcile IpmTransportCapacity {}: {}", key, e);
                let status = failed_status(&e.diagnostic(), resource.status.as_ref());
                let patch = create_transport_capacity_status_patch(&status);
                if let Err(patch_err) = api
                    .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await
                {
                    error!("Failed to update error status for {}: {}", key, patch_err);
                }
                Err(e)
            }
        }
    }

    /// Delete the IPM object before the resource goes away.
    ///
    /// A resource that never recorded an id is released without any call.
    pub async fn cleanup_transport_capacity(
        &self,
        resource: &IpmTransportCapacity,
        cancel: &CancellationToken,
    ) -> Result<Action, ControllerError> {
        let key = format!("{}/{}", resource.namespace().unwrap_or_default(), resource.name_any());
        let status = resource.status.as_ref();
        let recorded_id = status
            .and_then(|s| s.id.as_deref())
            .filter(|id| !id.is_empty());

        // A status pointing at an endpoint or capacity link is never deleted
        if let Some((kind, child_id)) = status.and_then(|s| s.href.as_deref()).and_then(owned_child) {
            warn!("IpmTransportCapacity {} records {} {} instead of its parent", key, kind, child_id);
            self.delete_child(kind, child_id)?;
        }

        match recorded_id {
            Some(id) => {
                info!("Deleting transport capacity {} for {}", id, key);
                self.delete(Some(id), cancel).await?;
            }
            None => info!("IpmTransportCapacity {} has no IPM object, releasing", key),
        }

        self.forget(&key);
        Ok(Action::await_change())
    }
}
