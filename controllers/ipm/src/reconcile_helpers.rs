//! Helper functions for `IpmTransportCapacity` status
//!
//! Status is written with JSON merge patches, so every field is spelled out
//! (as `null` when unset) to clear what an earlier reconcile wrote.

use crate::error::Diagnostic;
use crds::{CapacityState, IpmTransportCapacityStatus, ObservedTransportCapacity};
use ipm_client::TransportCapacity;
use serde_json::json;

/// Status after a successful reconcile
pub fn observed_status(tc: &TransportCapacity) -> IpmTransportCapacityStatus {
    IpmTransportCapacityStatus {
        id: Some(tc.id.clone()),
        href: Some(tc.href.clone()),
        state: if tc.is_configured() {
            CapacityState::Configured
        } else {
            CapacityState::Pending
        },
        lifecycle_state: tc.lifecycle_state.clone(),
        error: None,
        observed: Some(ObservedTransportCapacity::from(tc)),
    }
}

/// Status after a failed reconcile.
///
/// A previously confirmed `id` and `href` are kept so the next reconcile
/// finds the same IPM object and cleanup can still delete it. Without one,
/// nothing unconfirmed is recorded.
pub fn failed_status(
    diagnostic: &Diagnostic,
    recorded: Option<&IpmTransportCapacityStatus>,
) -> IpmTransportCapacityStatus {
    match recorded.filter(|s| s.id.as_deref().is_some_and(|id| !id.is_empty())) {
        Some(confirmed) => IpmTransportCapacityStatus {
            state: CapacityState::Failed,
            error: Some(diagnostic.to_string()),
            ..confirmed.clone()
        },
        None => IpmTransportCapacityStatus {
            id: None,
            href: None,
            state: CapacityState::Failed,
            lifecycle_state: None,
            error: Some(diagnostic.to_string()),
            observed: None,
        },
    }
}

/// Helper to create the status patch JSON with PascalCase state values
/// CRD validation schemas expect PascalCase enum values ("Pending", "Configured", "Failed").
pub fn create_transport_capacity_status_patch(
    status: &IpmTransportCapacityStatus,
) -> serde_json::Value {
    let state_str = match status.state {
        CapacityState::Pending => "Pending",
        CapacityState::Configured => "Configured",
        CapacityState::Failed => "Failed",
    };

    json!({
        "status": {
            "id": status.id,
            "href": status.href,
            "state": state_str,
            "lifecycleState": status.lifecycle_state,
            "error": status.error,
            "observed": status.observed,
        }
    })
}

/// Check if status needs updating
///
/// Skipping identical writes keeps status patches from re-triggering the watch.
pub fn status_needs_update(
    current_status: Option<&IpmTransportCapacityStatus>,
    desired_status: &IpmTransportCapacityStatus,
) -> bool {
    current_status != Some(desired_status)
}
