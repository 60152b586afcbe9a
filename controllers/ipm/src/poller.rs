//! Lifecycle polling against IPM.
//!
//! One generic loop drives both precondition checks: the network-state check
//! run before a transport capacity is created, and the resource-state check
//! that waits for a single object to become `configured`. The loop walks a
//! list of alternative queries (primary first) and asks a judge closure for a
//! [`Verdict`] on each decoded response.

use crate::error::ControllerError;
use ipm_client::decode::{decode_many, one_or_many, Node};
use ipm_client::{IpmClientTrait, XrNetwork, LIFECYCLE_CONFIGURED};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run a future unless the token is cancelled first
pub async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, ControllerError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ControllerError::Cancelled),
        output = future => Ok(output),
    }
}

/// Sleep unless the token is cancelled first
pub async fn pause(cancel: &CancellationToken, duration: Duration) -> Result<(), ControllerError> {
    cancellable(cancel, tokio::time::sleep(duration)).await
}

/// Outcome of judging one response
#[derive(Debug)]
pub enum Verdict<T> {
    /// Condition met
    Satisfied(T),
    /// Not yet; try again after the poll interval
    Pending,
    /// The query did not find anything; move to the next alternative query
    Miss,
    /// Structural failure; stop polling
    Fatal(ControllerError),
}

/// Polls IPM at a fixed cadence
pub struct Poller<'a> {
    client: &'a dyn IpmClientTrait,
    cancel: &'a CancellationToken,
    interval: Duration,
}

impl<'a> Poller<'a> {
    pub fn new(client: &'a dyn IpmClientTrait, cancel: &'a CancellationToken, interval: Duration) -> Self {
        Self { client, cancel, interval }
    }

    /// Poll `queries` up to `attempts` times until `judge` is satisfied.
    ///
    /// A failed GET or a [`Verdict::Miss`] switches to the next alternative
    /// query within the same attempt; the switch is permanent. A failed GET
    /// on the last query is returned as is. The poller
    /// sleeps `interval` between attempts. Exhausting attempts is
    /// [`ControllerError::PreconditionFailed`] naming `what`.
    pub async fn poll<T, F>(
        &self,
        what: &str,
        queries: &[String],
        attempts: u32,
        mut judge: F,
    ) -> Result<T, ControllerError>
    where
        F: FnMut(&Value) -> Verdict<T>,
    {
        let mut current = 0usize;

        for attempt in 1..=attempts.max(1) {
            if attempt > 1 {
                pause(self.cancel, self.interval).await?;
            }

            loop {
                let Some(query) = queries.get(current) else {
                    break;
                };
                debug!("Checking {} (attempt {}/{}): GET {}", what, attempt, attempts, query);

                let verdict = match cancellable(self.cancel, self.client.get_json(query)).await? {
                    Ok(value) => judge(&value),
                    // Only the primary query may fail over; the last query's errors surface
                    Err(e) if current + 1 < queries.len() => {
                        warn!("GET {} failed while checking {}: {}", query, what, e);
                        Verdict::Miss
                    }
                    Err(e) => return Err(e.into()),
                };

                match verdict {
                    Verdict::Satisfied(found) => return Ok(found),
                    Verdict::Fatal(e) => return Err(e),
                    Verdict::Pending => break,
                    Verdict::Miss if current + 1 < queries.len() => {
                        current += 1;
                        warn!("{}: falling back to alternate query", what);
                    }
                    Verdict::Miss => break,
                }
            }
        }

        Err(ControllerError::PreconditionFailed(format!(
            "{} is not configured after {} attempts",
            what, attempts
        )))
    }

    /// Wait for a constellation containing one of the endpoints to be usable.
    ///
    /// `primary` and `fallback` locate the xr-network by each endpoint; `ids`
    /// are the endpoint identifiers a configured leaf must match.
    pub async fn check_network_state(
        &self,
        primary: String,
        fallback: String,
        ids: [&str; 2],
        attempts: u32,
    ) -> Result<XrNetwork, ControllerError> {
        let what = format!("xr-network for {} / {}", ids[0], ids[1]);
        let queries = [primary, fallback];

        self.poll(&what, &queries, attempts, |value| {
            let networks: Vec<XrNetwork> = match decode_many(value) {
                Ok(networks) => networks,
                Err(e) => return Verdict::Fatal(e.into()),
            };
            if networks.is_empty() {
                return Verdict::Miss;
            }

            for network in networks {
                if network.leaf_modules.is_empty() {
                    return Verdict::Fatal(ControllerError::NoLeaf(network.display_name().to_string()));
                }
                if network.is_ready() && network.has_matching_leaf(&ids) {
                    debug!(
                        "xr-network {} is {} with a matching leaf",
                        network.display_name(),
                        network.lifecycle_state.as_deref().unwrap_or_default()
                    );
                    return Verdict::Satisfied(network);
                }
                debug!(
                    "xr-network {} not ready (lifecycleState {:?})",
                    network.display_name(),
                    network.lifecycle_state
                );
            }
            Verdict::Pending
        })
        .await
    }

    /// Wait for the object at `query` to report `state.lifecycleState == configured`
    pub async fn check_resource_state(&self, query: &str, attempts: u32) -> Result<(), ControllerError> {
        let queries = [query.to_string()];

        self.poll(query, &queries, attempts, |value| {
            let configured = one_or_many(value).first().is_some_and(|v| {
                Node::new(v).path("state.lifecycleState").str().as_deref() == Some(LIFECYCLE_CONFIGURED)
            });
            if configured {
                Verdict::Satisfied(())
            } else {
                Verdict::Pending
            }
        })
        .await
    }
}
