//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

#[cfg(test)]
use crate::reconciler::transport_capacity::{EndpointDesired, TransportCapacityDesired};
#[cfg(test)]
use crate::reconciler::{Reconciler, Timings};
#[cfg(test)]
use crds::{EndpointSelectorSpec, EndpointSpec, IpmTransportCapacity, IpmTransportCapacitySpec, IpmTransportCapacityStatus};
#[cfg(test)]
use ipm_client::common::query::expanded_with_q;
#[cfg(test)]
use ipm_client::{EndpointSelector, MockIpmClient, ModuleIfSelectorByModuleName, XR_NETWORKS_PATH};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use serde_json::{json, Value};

/// Reconciler over a mock client with the production timings
#[cfg(test)]
pub fn create_test_reconciler(mock: &MockIpmClient) -> Reconciler {
    Reconciler::new(mock.clone(), Timings::default())
}

/// `moduleIfSelectorByModuleName` selector
#[cfg(test)]
pub fn by_name(module_name: &str, aid: &str) -> EndpointSelector {
    EndpointSelector::ModuleIfByModuleName(ModuleIfSelectorByModuleName {
        module_name: module_name.to_string(),
        module_client_if_aid: aid.to_string(),
    })
}

/// Desired capacity whose endpoints are `(moduleName, capacity)` pairs on client interface CIF1
#[cfg(test)]
pub fn desired_by_name(capacity_mode: &str, endpoints: &[(&str, i64)]) -> TransportCapacityDesired {
    TransportCapacityDesired {
        name: None,
        capacity_mode: capacity_mode.to_string(),
        labels: Default::default(),
        endpoints: endpoints
            .iter()
            .map(|(module, capacity)| EndpointDesired {
                capacity: *capacity,
                selector: by_name(module, "CIF1"),
            })
            .collect(),
    }
}

/// The two `/xr-networks` queries a create issues for modules `a` and `b`
#[cfg(test)]
pub fn network_queries(a: &str, b: &str) -> (String, String) {
    (
        expanded_with_q(XR_NETWORKS_PATH, &by_name(a, "CIF1").query_predicate()),
        expanded_with_q(XR_NETWORKS_PATH, &by_name(b, "CIF1").query_predicate()),
    )
}

/// Controller-managed leaf declared by module name
#[cfg(test)]
pub fn leaf_json(module_name: &str, lifecycle: &str) -> Value {
    json!({
        "config": {
            "managedBy": "cm",
            "selector": {"moduleSelectorByModuleName": {"moduleName": module_name}}
        },
        "state": {"lifecycleState": lifecycle}
    })
}

/// xr-network with configured leaves for each module name
#[cfg(test)]
pub fn network_json(name: &str, lifecycle: &str, leaf_names: &[&str]) -> Value {
    let leaves: Vec<Value> = leaf_names
        .iter()
        .map(|n| leaf_json(n, "configured"))
        .collect();
    json!({
        "state": {"name": name, "lifecycleState": lifecycle},
        "leafModules": leaves
    })
}

/// Expanded transport capacity; endpoints are `(id, moduleName, capacity)` on CIF1
#[cfg(test)]
pub fn tc_json(id: &str, capacity_mode: &str, lifecycle: &str, endpoints: &[(&str, &str, i64)]) -> Value {
    let endpoints: Vec<Value> = endpoints
        .iter()
        .map(|(eid, module, capacity)| {
            json!({
                "id": eid,
                "href": format!("/transport-capacities/{}/endpoints/{}", id, eid),
                "config": {
                    "capacity": capacity,
                    "selector": by_name(module, "CIF1").to_json()
                },
                "state": {
                    "capacity": capacity,
                    "lifecycleState": lifecycle,
                    "moduleIf": {"moduleName": module, "clientIfAid": "CIF1"}
                }
            })
        })
        .collect();

    json!({
        "id": id,
        "href": format!("/transport-capacities/{}", id),
        "config": {"capacityMode": capacity_mode},
        "state": {"capacityMode": capacity_mode, "lifecycleState": lifecycle},
        "endpoints": endpoints,
        "capacityLinks": []
    })
}

/// `IpmTransportCapacity` resource for `desired`, with an optional status
#[cfg(test)]
pub fn create_test_transport_capacity(
    name: &str,
    namespace: &str,
    desired: &TransportCapacityDesired,
    status: Option<IpmTransportCapacityStatus>,
) -> IpmTransportCapacity {
    IpmTransportCapacity {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: IpmTransportCapacitySpec {
            name: desired.name.clone(),
            capacity_mode: desired.capacity_mode.clone(),
            labels: desired.labels.clone(),
            endpoints: desired
                .endpoints
                .iter()
                .map(|ep| EndpointSpec {
                    capacity: ep.capacity,
                    selector: EndpointSelectorSpec::from(&ep.selector),
                })
                .collect(),
        },
        status,
    }
}
