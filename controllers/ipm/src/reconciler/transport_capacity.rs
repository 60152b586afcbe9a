//! Transport capacity create, read, update and delete against IPM.
//!
//! Every HTTP call and every wait goes through the caller's cancellation
//! token; a cancelled reconcile returns [`ControllerError::Cancelled`] and
//! leaves IPM in whatever state it reached.

use super::Reconciler;
use crate::error::ControllerError;
use crate::poller::{cancellable, pause};
use crds::IpmTransportCapacitySpec;
use ipm_client::common::query::{and, elem_match, equals, expanded, expanded_with_q};
use ipm_client::decode::{decode_one, one_or_many, Node};
use ipm_client::models::selector::MODULE_IF_BY_MODULE_NAME;
use ipm_client::{
    id_from_href, EndpointSelector, TransportCapacity, CAPACITY_LINKS_PATH, PORT_MODE,
    TRANSPORT_CAPACITIES_PATH, XR_NETWORKS_PATH,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const NETWORK_CHECK_ATTEMPTS: u32 = 5;
const READ_AFTER_CREATE_ATTEMPTS: u32 = 3;
const READ_AFTER_UPDATE_ATTEMPTS: u32 = 2;

/// One desired endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDesired {
    pub capacity: i64,
    pub selector: EndpointSelector,
}

/// Desired transport capacity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportCapacityDesired {
    pub name: Option<String>,
    pub capacity_mode: String,
    pub labels: BTreeMap<String, String>,
    pub endpoints: Vec<EndpointDesired>,
}

impl TryFrom<&IpmTransportCapacitySpec> for TransportCapacityDesired {
    type Error = ControllerError;

    fn try_from(spec: &IpmTransportCapacitySpec) -> Result<Self, Self::Error> {
        let endpoints = spec
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, ep)| {
                EndpointSelector::try_from(&ep.selector)
                    .map(|selector| EndpointDesired {
                        capacity: ep.capacity,
                        selector,
                    })
                    .map_err(|e| ControllerError::InvalidInput(format!("endpoint {}: {}", i, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: spec.name.clone(),
            capacity_mode: spec.capacity_mode.clone(),
            labels: spec.labels.clone(),
            endpoints,
        })
    }
}

impl TransportCapacityDesired {
    /// Check the create preconditions: two endpoints, a mode, usable selectors
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.endpoints.len() != 2 {
            return Err(ControllerError::InvalidInput(format!(
                "a transport capacity needs exactly 2 endpoints, got {}",
                self.endpoints.len()
            )));
        }
        if self.capacity_mode.trim().is_empty() {
            return Err(ControllerError::InvalidInput(
                "capacityMode is required".to_string(),
            ));
        }
        for (i, ep) in self.endpoints.iter().enumerate() {
            if ep.capacity < 0 {
                return Err(ControllerError::InvalidInput(format!(
                    "endpoint {}: capacity must not be negative, got {}",
                    i, ep.capacity
                )));
            }
            ep.selector
                .validate()
                .map_err(|e| ControllerError::InvalidInput(format!("endpoint {}: {}", i, e)))?;
        }
        Ok(())
    }

    /// True when both endpoints can be found by the compound lookup
    pub fn is_importable(&self) -> bool {
        self.endpoints.len() == 2
            && self
                .endpoints
                .iter()
                .all(|ep| ep.selector.as_module_if_by_name().is_some())
    }

    /// POST body: a one-element list
    fn create_body(&self) -> Value {
        let mut config = Map::new();
        if let Some(name) = &self.name {
            config.insert("name".to_string(), json!(name));
        }
        config.insert("capacityMode".to_string(), json!(self.capacity_mode));
        if !self.labels.is_empty() {
            config.insert("labels".to_string(), json!(self.labels));
        }

        let endpoints: Vec<Value> = self
            .endpoints
            .iter()
            .map(|ep| json!({ "capacity": ep.capacity, "selector": ep.selector.to_json() }))
            .collect();

        json!([{ "config": config, "endpoints": endpoints }])
    }

    /// `$and` of the capacity mode and one `$elemMatch` per by-name endpoint
    fn lookup_predicate(&self) -> Result<Value, ControllerError> {
        if !self.is_importable() {
            return Err(ControllerError::InvalidInput(format!(
                "lookup without an id needs two {} endpoints",
                MODULE_IF_BY_MODULE_NAME
            )));
        }

        let prefix = format!("config.selector.{}", MODULE_IF_BY_MODULE_NAME);
        let mut clauses = vec![json!({ "config.capacityMode": self.capacity_mode })];
        for by_name in self
            .endpoints
            .iter()
            .filter_map(|ep| ep.selector.as_module_if_by_name())
        {
            clauses.push(elem_match(
                "endpoints",
                equals([
                    (format!("{}.moduleName", prefix), by_name.module_name.as_str()),
                    (
                        format!("{}.moduleClientIfAid", prefix),
                        by_name.module_client_if_aid.as_str(),
                    ),
                ]),
            ));
        }
        Ok(and(clauses))
    }
}

/// How a transport capacity is located
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    /// By IPM id
    Id(&'a str),
    /// By capacity mode and both endpoints' module-by-name selectors
    Endpoints(&'a TransportCapacityDesired),
}

/// Changes needed to move an observed transport capacity to the desired one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Fields for the PUT to the transport capacity itself
    pub root: Map<String, Value>,
    /// `(endpoint id, capacity)` pairs to PUT
    pub endpoints: Vec<(String, i64)>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.endpoints.is_empty()
    }
}

/// Compute the updates that bring `current` to `desired`.
///
/// Capacity mode and endpoint selectors cannot change in place. Endpoints are
/// paired by selector, falling back to position when IPM reported none. In
/// port mode endpoint capacity is server-managed and never part of the set.
pub fn change_set(
    current: &TransportCapacity,
    desired: &TransportCapacityDesired,
) -> Result<ChangeSet, ControllerError> {
    if desired.endpoints.len() != 2 {
        return Err(ControllerError::InvalidInput(format!(
            "a transport capacity needs exactly 2 endpoints, got {}",
            desired.endpoints.len()
        )));
    }
    if let Some(mode) = current.capacity_mode.as_deref() {
        if mode != desired.capacity_mode {
            return Err(ControllerError::InvalidInput(format!(
                "capacityMode of transport capacity {} cannot change from {} to {}",
                current.id, mode, desired.capacity_mode
            )));
        }
    }

    let mut changes = ChangeSet::default();
    if let Some(name) = &desired.name {
        if current.name.as_ref() != Some(name) {
            changes.root.insert("name".to_string(), json!(name));
        }
    }
    if current.labels != desired.labels {
        changes.root.insert("labels".to_string(), json!(desired.labels));
    }

    for (i, ep) in desired.endpoints.iter().enumerate() {
        let observed = current
            .endpoints
            .iter()
            .find(|c| c.selector.as_ref() == Some(&ep.selector))
            .or_else(|| current.endpoints.get(i).filter(|c| c.selector.is_none()));
        let Some(observed) = observed else {
            return Err(ControllerError::InvalidInput(format!(
                "endpoint {} ({}) is not part of transport capacity {}; endpoints cannot be replaced",
                i,
                ep.selector.identifier(),
                current.id
            )));
        };
        if desired.capacity_mode != PORT_MODE && observed.capacity != Some(ep.capacity) {
            changes.endpoints.push((observed.id.clone(), ep.capacity));
        }
    }

    Ok(changes)
}

impl Reconciler {
    /// Create a transport capacity once its constellation is usable.
    ///
    /// No POST is issued before the network-state check succeeds.
    pub async fn create(
        &self,
        desired: &TransportCapacityDesired,
        cancel: &CancellationToken,
    ) -> Result<TransportCapacity, ControllerError> {
        desired.validate()?;
        let [a, b] = desired.endpoints.as_slice() else {
            return Err(ControllerError::InvalidInput(
                "a transport capacity needs exactly 2 endpoints".to_string(),
            ));
        };

        let (id_a, id_b) = (a.selector.identifier(), b.selector.identifier());
        info!("Checking xr-network state for endpoints {} and {}", id_a, id_b);
        let network = self
            .poller(cancel)
            .check_network_state(
                expanded_with_q(XR_NETWORKS_PATH, &a.selector.query_predicate()),
                expanded_with_q(XR_NETWORKS_PATH, &b.selector.query_predicate()),
                [id_a.as_str(), id_b.as_str()],
                NETWORK_CHECK_ATTEMPTS,
            )
            .await?;
        info!(
            "xr-network {} is usable, creating transport capacity {} <-> {}",
            network.display_name(),
            id_a,
            id_b
        );

        let response = cancellable(
            cancel,
            self.ipm_client
                .post_json(TRANSPORT_CAPACITIES_PATH, &desired.create_body()),
        )
        .await??;

        let href = one_or_many(&response)
            .first()
            .and_then(|v| Node::new(v).get("href").str())
            .ok_or_else(|| {
                ControllerError::MalformedResponse(format!(
                    "POST {} returned no href",
                    TRANSPORT_CAPACITIES_PATH
                ))
            })?;
        let id = id_from_href(&href)
            .ok_or_else(|| ControllerError::MalformedResponse(format!("href '{}' has no id", href)))?
            .to_string();
        info!("Created transport capacity {} ({})", id, href);

        self.read(Lookup::Id(&id), READ_AFTER_CREATE_ATTEMPTS, cancel)
            .await?
            .ok_or_else(|| {
                ControllerError::PreconditionFailed(format!(
                    "transport capacity {} not found after create",
                    id
                ))
            })
    }

    /// Read a transport capacity with up to `attempts` GETs.
    ///
    /// Failed GETs are retried after the read retry interval, and so is a
    /// capacity that is not yet `configured`; the last answer wins. A 404 or
    /// an empty result is `Ok(None)`.
    pub async fn read(
        &self,
        lookup: Lookup<'_>,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<TransportCapacity>, ControllerError> {
        let query = match lookup {
            Lookup::Id(id) if id.is_empty() => {
                return Err(ControllerError::InvalidInput(
                    "read requires a transport capacity id".to_string(),
                ));
            }
            Lookup::Id(id) => expanded(&TransportCapacity::path(id)),
            Lookup::Endpoints(desired) => {
                expanded_with_q(TRANSPORT_CAPACITIES_PATH, &desired.lookup_predicate()?)
            }
        };

        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!("Reading transport capacity (attempt {}/{}): GET {}", attempt, attempts, query);
            match cancellable(cancel, self.ipm_client.get_json(&query)).await? {
                Ok(value) => match decode_one::<TransportCapacity>(&value)? {
                    None => return Ok(None),
                    Some(tc) if tc.is_configured() || attempt >= attempts => return Ok(Some(tc)),
                    Some(tc) => debug!(
                        "Transport capacity {} is {:?}, reading again",
                        tc.id, tc.lifecycle_state
                    ),
                },
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) if attempt >= attempts => return Err(e.into()),
                Err(e) => warn!(
                    "GET {} failed (attempt {}/{}): {}",
                    query, attempt, attempts, e
                ),
            }

            attempt += 1;
            pause(cancel, self.timings.read_retry_interval).await?;
        }
    }

    /// Apply name, label and endpoint capacity changes, then re-read.
    pub async fn update(
        &self,
        current: &TransportCapacity,
        desired: &TransportCapacityDesired,
        cancel: &CancellationToken,
    ) -> Result<TransportCapacity, ControllerError> {
        if current.id.is_empty() {
            return Err(ControllerError::InvalidInput(
                "update requires a transport capacity id".to_string(),
            ));
        }
        let changes = change_set(current, desired)?;

        if !changes.root.is_empty() {
            info!(
                "Updating transport capacity {} ({})",
                current.id,
                changes.root.keys().cloned().collect::<Vec<_>>().join(", ")
            );
            cancellable(
                cancel,
                self.ipm_client.put_json(
                    &TransportCapacity::path(&current.id),
                    &Value::Object(changes.root.clone()),
                ),
            )
            .await??;
        }

        for (endpoint_id, capacity) in &changes.endpoints {
            info!(
                "Updating capacity of endpoint {} on transport capacity {} to {}",
                endpoint_id, current.id, capacity
            );
            cancellable(
                cancel,
                self.ipm_client.put_json(
                    &TransportCapacity::endpoint_path(&current.id, endpoint_id),
                    &json!({ "capacity": capacity }),
                ),
            )
            .await??;
        }

        self.read(Lookup::Id(&current.id), READ_AFTER_UPDATE_ATTEMPTS, cancel)
            .await?
            .ok_or_else(|| {
                ControllerError::PreconditionFailed(format!(
                    "transport capacity {} not found after update",
                    current.id
                ))
            })
    }

    /// Delete a transport capacity after the grace wait.
    ///
    /// A capacity IPM no longer knows (404) counts as deleted.
    pub async fn delete(
        &self,
        id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), ControllerError> {
        let id = id.filter(|id| !id.is_empty()).ok_or_else(|| {
            ControllerError::InvalidInput("delete requires a transport capacity id".to_string())
        })?;

        pause(cancel, self.timings.delete_grace).await?;

        let path = TransportCapacity::path(id);
        match cancellable(cancel, self.ipm_client.delete(&path)).await? {
            Ok(()) => {
                info!("Deleted transport capacity {}", id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("Transport capacity {} already absent from IPM", id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete transport capacity {}: {}", id, e);
                Err(ControllerError::DeleteFailed(e.to_string()))
            }
        }
    }

    /// Endpoints and capacity links are owned by their transport capacity.
    /// Always an error; the parent's delete removes them.
    pub fn delete_child(&self, kind: &str, id: &str) -> Result<(), ControllerError> {
        Err(ControllerError::InvalidInput(format!(
            "{} {} is owned by its transport capacity and cannot be deleted directly",
            kind, id
        )))
    }
}

/// Kind and id of the transport capacity child an href names, if any
pub fn owned_child(href: &str) -> Option<(&'static str, &str)> {
    let kind = if href.starts_with(&format!("{}/", CAPACITY_LINKS_PATH)) {
        "capacityLink"
    } else if href.starts_with(&format!("{}/", TRANSPORT_CAPACITIES_PATH))
        && href.contains("/endpoints/")
    {
        "transportCapacityEndpoint"
    } else {
        return None;
    };
    id_from_href(href).map(|id| (kind, id))
}
