//! Reconciliation logic for IPM transport capacities.
//!
//! - `transport_capacity`: create, read, update and delete against IPM
//! - `apply`: the apply and cleanup flow run for each `IpmTransportCapacity`

pub mod apply;
pub mod transport_capacity;


use crate::backoff::FibonacciBackoff;
use crate::poller::Poller;
use ipm_client::IpmClientTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Waits used by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// Cadence of the network-state and resource-state checks
    pub poll_interval: Duration,
    /// Wait between read attempts
    pub read_retry_interval: Duration,
    /// Wait before a DELETE is issued
    pub delete_grace: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            read_retry_interval: Duration::from_secs(2),
            delete_grace: Duration::from_secs(1),
        }
    }
}

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(15, 600), // 15 seconds min, 10 minutes max
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles transport capacities against IPM.
pub struct Reconciler {
    pub(crate) ipm_client: Box<dyn IpmClientTrait>,
    pub(crate) timings: Timings,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(ipm_client: impl IpmClientTrait + 'static, timings: Timings) -> Self {
        Self {
            ipm_client: Box::new(ipm_client),
            timings,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// State poller bound to this reconciler's client and cadence
    pub(crate) fn poller<'a>(&'a self, cancel: &'a CancellationToken) -> Poller<'a> {
        Poller::new(self.ipm_client.as_ref(), cancel, self.timings.poll_interval)
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (self.timings.poll_interval.as_secs(), 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }

    /// Drop backoff tracking for a resource that no longer exists
    pub fn forget(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}
