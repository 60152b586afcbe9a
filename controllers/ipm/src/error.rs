//! Controller-specific error types.
//!
//! This module defines the error kinds surfaced by the transport-capacity
//! reconciler and the Kubernetes adapter around it.

use ipm_client::IpmError;
use kube::Error as KubeError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur in the IPM Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Transport failure or non-2xx answer from IPM
    #[error("IPM error: {0}")]
    Ipm(IpmError),

    /// Missing or mutually exclusive identifiers, wrong endpoint count
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network-state or resource-state check exhausted its attempts
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Constellation has no leaf modules
    #[error("No leaf modules in network {0}")]
    NoLeaf(String),

    /// Response decoded but identifying keys are missing
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// DELETE was rejected by IPM
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// Cancellation observed at a suspension point
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Finalizer add/remove or cleanup failed
    #[error("Finalizer error: {0}")]
    Finalizer(String),

    /// Watcher task ended or panicked
    #[error("Watch error: {0}")]
    Watch(String),
}

impl From<IpmError> for ControllerError {
    fn from(e: IpmError) -> Self {
        match e {
            IpmError::MalformedResponse(m) => ControllerError::MalformedResponse(m),
            IpmError::InvalidSelector(m) => ControllerError::InvalidInput(m),
            other => ControllerError::Ipm(other),
        }
    }
}

/// Short title plus detail, as written to `status.error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub summary: &'static str,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

impl ControllerError {
    pub fn diagnostic(&self) -> Diagnostic {
        let (summary, detail) = match self {
            ControllerError::Kube(e) => ("Kubernetes API error", e.to_string()),
            ControllerError::Ipm(e) => ("IPM request failed", e.to_string()),
            ControllerError::InvalidInput(m) => ("Invalid input", m.clone()),
            ControllerError::PreconditionFailed(m) => ("Precondition failed", m.clone()),
            ControllerError::NoLeaf(network) => (
                "Network has no leaf modules",
                format!("xr-network {} has no leaf modules", network),
            ),
            ControllerError::MalformedResponse(m) => ("Malformed IPM response", m.clone()),
            ControllerError::DeleteFailed(m) => ("Delete failed", m.clone()),
            ControllerError::Cancelled => (
                "Cancelled",
                "reconciliation was cancelled before completion".to_string(),
            ),
            ControllerError::InvalidConfig(m) => ("Invalid configuration", m.clone()),
            ControllerError::Finalizer(m) => ("Finalizer error", m.clone()),
            ControllerError::Watch(m) => ("Watch error", m.clone()),
        };
        Diagnostic { summary, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipm_errors_route_to_their_kinds() {
        let malformed: ControllerError =
            IpmError::MalformedResponse("missing 'id'".to_string()).into();
        assert!(matches!(malformed, ControllerError::MalformedResponse(_)));

        let selector: ControllerError = IpmError::InvalidSelector("two".to_string()).into();
        assert!(matches!(selector, ControllerError::InvalidInput(_)));

        let status: ControllerError = IpmError::Status {
            method: "GET".to_string(),
            path: "/x".to_string(),
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(status, ControllerError::Ipm(_)));
    }

    #[test]
    fn test_diagnostic_keeps_server_message() {
        let err = ControllerError::DeleteFailed(
            "DELETE /transport-capacities/tc-1 failed, status: 409 - in use".to_string(),
        );
        let diagnostic = err.diagnostic();
        assert_eq!(diagnostic.summary, "Delete failed");
        assert!(diagnostic.to_string().contains("status: 409 - in use"));
    }

    #[test]
    fn test_no_leaf_names_network() {
        let diagnostic = ControllerError::NoLeaf("XR-1".to_string()).diagnostic();
        assert_eq!(diagnostic.detail, "xr-network XR-1 has no leaf modules");
    }
}
