//! IPM Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the IPM controller.

pub mod transport_capacity;

pub use transport_capacity::*;
