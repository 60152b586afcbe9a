//! Unit tests for reconcile_helpers module

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconcile_helpers::*;
    use crate::test_utils::tc_json;
    use crds::{CapacityState, IpmTransportCapacityStatus};
    use ipm_client::decode::decode_one;
    use ipm_client::TransportCapacity;
    use serde_json::json;

    fn tc(lifecycle: &str) -> TransportCapacity {
        decode_one(&tc_json(
            "tc-1",
            "mode100",
            lifecycle,
            &[("ep-a", "modA", 100), ("ep-b", "modB", 100)],
        ))
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_observed_status_tracks_lifecycle() {
        let configured = observed_status(&tc("configured"));
        assert_eq!(configured.id.as_deref(), Some("tc-1"));
        assert_eq!(configured.href.as_deref(), Some("/transport-capacities/tc-1"));
        assert_eq!(configured.state, CapacityState::Configured);
        assert_eq!(configured.error, None);

        let observed = configured.observed.unwrap();
        assert_eq!(observed.capacity_mode.as_deref(), Some("mode100"));
        assert_eq!(observed.endpoints.len(), 2);
        assert_eq!(observed.endpoints[0].identifier.as_deref(), Some("modA"));

        let pending = observed_status(&tc("pendingConfiguration"));
        assert_eq!(pending.state, CapacityState::Pending);
        assert_eq!(pending.lifecycle_state.as_deref(), Some("pendingConfiguration"));
    }

    #[test]
    fn test_failed_patch_clears_id_and_href() {
        let diagnostic = ControllerError::NoLeaf("XR-1".to_string()).diagnostic();
        let patch = create_transport_capacity_status_patch(&failed_status(&diagnostic, None));

        assert_eq!(
            patch,
            json!({
                "status": {
                    "id": null,
                    "href": null,
                    "state": "Failed",
                    "lifecycleState": null,
                    "error": "Network has no leaf modules: xr-network XR-1 has no leaf modules",
                    "observed": null,
                }
            })
        );
    }

    #[test]
    fn test_failed_status_keeps_confirmed_id() {
        let confirmed = observed_status(&tc("configured"));
        let diagnostic = ControllerError::PreconditionFailed("tc-1 busy".to_string()).diagnostic();

        let failed = failed_status(&diagnostic, Some(&confirmed));
        assert_eq!(failed.id.as_deref(), Some("tc-1"));
        assert_eq!(failed.href.as_deref(), Some("/transport-capacities/tc-1"));
        assert_eq!(failed.state, CapacityState::Failed);
        assert_eq!(failed.error.as_deref(), Some("Precondition failed: tc-1 busy"));
        assert_eq!(failed.observed, confirmed.observed);

        let never_confirmed = IpmTransportCapacityStatus::default();
        assert_eq!(failed_status(&diagnostic, Some(&never_confirmed)).id, None);
    }

    #[test]
    fn test_success_patch_clears_error() {
        let patch = create_transport_capacity_status_patch(&observed_status(&tc("configured")));
        assert_eq!(patch["status"]["state"], json!("Configured"));
        assert_eq!(patch["status"]["error"], json!(null));
        assert_eq!(patch["status"]["observed"]["endpoints"][1]["id"], json!("ep-b"));
    }

    #[test]
    fn test_status_needs_update() {
        let desired = observed_status(&tc("configured"));
        assert!(status_needs_update(None, &desired));
        assert!(!status_needs_update(Some(&desired.clone()), &desired));

        let mut stale = desired.clone();
        stale.lifecycle_state = Some("pendingConfiguration".to_string());
        assert!(status_needs_update(Some(&stale), &desired));
    }
}
