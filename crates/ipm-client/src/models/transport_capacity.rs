//! Transport capacities, their endpoints and capacity links

use super::selector::EndpointSelector;
use super::LIFECYCLE_CONFIGURED;
use crate::common::query::expanded;
use crate::decode::{decode_many, decode_one, lenient, Decode, Node};
use crate::error::IpmError;
use crate::ipm_trait::IpmClientTrait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Collection path of transport capacities
pub const TRANSPORT_CAPACITIES_PATH: &str = "/transport-capacities";

/// Collection path of capacity links
pub const CAPACITY_LINKS_PATH: &str = "/capacity-links";

/// Prefer the observed `state.<key>`, fall back to the declared `config.<key>`
fn state_or_config<'a>(node: Node<'a>, key: &str) -> Node<'a> {
    let observed = node.get("state").get(key);
    if observed.is_present() {
        observed
    } else {
        node.get("config").get(key)
    }
}

/// Diagnostic detail attached to a lifecycle transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifecycleStateCause {
    #[serde(deserialize_with = "lenient::int")]
    pub action: Option<i64>,
    pub timestamp: Option<String>,
    pub trace_id: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub errors: Vec<StateError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateError {
    #[serde(deserialize_with = "lenient::text")]
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Host port an endpoint resolved to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostPort {
    pub host_name: Option<String>,
    pub host_port_name: Option<String>,
    pub chassis_id_subtype: Option<String>,
    pub chassis_id: Option<String>,
    pub port_id_subtype: Option<String>,
    pub port_id: Option<String>,
    pub sys_name: Option<String>,
    #[serde(rename = "portSourceMAC")]
    pub port_source_mac: Option<String>,
}

/// Module client interface an endpoint resolved to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleIf {
    pub module_id: Option<String>,
    pub module_name: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub client_if_aid: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub client_if_col_id: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub client_if_port_speed: Option<i64>,
}

/// Observed endpoint of a transport capacity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCapacityEndpoint {
    pub id: String,
    pub href: String,
    pub capacity: Option<i64>,
    pub selector: Option<EndpointSelector>,
    pub lifecycle_state: Option<String>,
    pub lifecycle_state_cause: Option<LifecycleStateCause>,
    pub host_port: Option<HostPort>,
    pub module_if: Option<ModuleIf>,
}

impl Decode for TransportCapacityEndpoint {
    const ENTITY: &'static str = "transportCapacityEndpoint";

    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        let selector = state_or_config(node, "selector")
            .value()
            .and_then(|v| EndpointSelector::from_json(v).ok());

        let module_if: Option<ModuleIf> = node.path("state.moduleIf").record()?;
        // A module interface wins when the server reports both
        let host_port = match module_if {
            Some(_) => None,
            None => node.path("state.hostPort").record()?,
        };

        Ok(Self {
            id: node.required_str("id", Self::ENTITY)?,
            href: node.required_str("href", Self::ENTITY)?,
            capacity: state_or_config(node, "capacity").int(),
            selector,
            lifecycle_state: node.path("state.lifecycleState").str(),
            lifecycle_state_cause: node.path("state.lifecycleStateCause").record()?,
            host_port,
            module_if,
        })
    }
}

/// One side (hub or leaf) of a capacity link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapacityLinkSide {
    pub module_id: Option<String>,
    pub module_name: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub client_if_aid: Option<String>,
    pub dscg_id: Option<String>,
    pub dscg_ctrl: Option<bool>,
    pub dscg_shared: Option<bool>,
    #[serde(rename = "txCDSCs", deserialize_with = "lenient::int_set")]
    pub tx_cdscs: Option<BTreeSet<i64>>,
    #[serde(rename = "rxCDSCs", deserialize_with = "lenient::int_set")]
    pub rx_cdscs: Option<BTreeSet<i64>>,
    #[serde(rename = "idleCDSCs", deserialize_with = "lenient::int_set")]
    pub idle_cdscs: Option<BTreeSet<i64>>,
}

/// Server-created allocation backing a transport capacity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityLink {
    pub id: String,
    pub href: String,
    pub directionality: Option<String>,
    pub hub_module: Option<CapacityLinkSide>,
    pub leaf_module: Option<CapacityLinkSide>,
    pub lifecycle_state: Option<String>,
    pub lifecycle_state_cause: Option<LifecycleStateCause>,
}

impl Decode for CapacityLink {
    const ENTITY: &'static str = "capacityLink";

    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        Ok(Self {
            id: node.required_str("id", Self::ENTITY)?,
            href: node.required_str("href", Self::ENTITY)?,
            directionality: state_or_config(node, "directionality").str(),
            hub_module: state_or_config(node, "hubModule").record()?,
            leaf_module: state_or_config(node, "leafModule").record()?,
            lifecycle_state: node.path("state.lifecycleState").str(),
            lifecycle_state_cause: node.path("state.lifecycleStateCause").record()?,
        })
    }
}

impl CapacityLink {
    /// GET `/capacity-links/{id}?content=expanded`; `None` when the server
    /// answers with an empty sequence
    pub async fn fetch(client: &dyn IpmClientTrait, id: &str) -> Result<Option<Self>, IpmError> {
        debug!("Fetching capacity link {}", id);
        let value = client
            .get_json(&expanded(&format!("{}/{}", CAPACITY_LINKS_PATH, id)))
            .await?;
        decode_one(&value)
    }

    /// GET `/capacity-links?content=expanded`
    pub async fn fetch_all(client: &dyn IpmClientTrait) -> Result<Vec<Self>, IpmError> {
        let value = client.get_json(&expanded(CAPACITY_LINKS_PATH)).await?;
        decode_many(&value)
    }
}

/// Observed transport capacity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCapacity {
    pub id: String,
    pub href: String,
    pub name: Option<String>,
    pub managed_by: Option<String>,
    pub capacity_mode: Option<String>,
    pub lifecycle_state: Option<String>,
    pub lifecycle_state_cause: Option<LifecycleStateCause>,
    pub labels: BTreeMap<String, String>,
    pub endpoints: Vec<TransportCapacityEndpoint>,
    pub capacity_links: Vec<CapacityLink>,
}

impl Decode for TransportCapacity {
    const ENTITY: &'static str = "transportCapacity";

    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        let endpoints = node
            .get("endpoints")
            .items()
            .into_iter()
            .map(TransportCapacityEndpoint::decode)
            .collect::<Result<Vec<_>, _>>()?;
        let capacity_links = node
            .get("capacityLinks")
            .items()
            .into_iter()
            .map(CapacityLink::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: node.required_str("id", Self::ENTITY)?,
            href: node.required_str("href", Self::ENTITY)?,
            name: state_or_config(node, "name").str(),
            managed_by: state_or_config(node, "managedBy").str(),
            capacity_mode: state_or_config(node, "capacityMode").str(),
            lifecycle_state: node.path("state.lifecycleState").str(),
            lifecycle_state_cause: node.path("state.lifecycleStateCause").record()?,
            labels: state_or_config(node, "labels").string_map(),
            endpoints,
            capacity_links,
        })
    }
}

impl TransportCapacity {
    /// Path of one transport capacity
    pub fn path(id: &str) -> String {
        format!("{}/{}", TRANSPORT_CAPACITIES_PATH, id)
    }

    /// Path of one endpoint of a transport capacity
    pub fn endpoint_path(id: &str, endpoint_id: &str) -> String {
        format!("{}/{}/endpoints/{}", TRANSPORT_CAPACITIES_PATH, id, endpoint_id)
    }

    pub fn is_configured(&self) -> bool {
        self.lifecycle_state.as_deref() == Some(LIFECYCLE_CONFIGURED)
    }

    /// GET `/transport-capacities/{id}/endpoints?content=expanded`
    pub async fn fetch_endpoints(
        client: &dyn IpmClientTrait,
        id: &str,
    ) -> Result<Vec<TransportCapacityEndpoint>, IpmError> {
        debug!("Fetching endpoints of transport capacity {}", id);
        let value = client
            .get_json(&expanded(&format!("{}/endpoints", Self::path(id))))
            .await?;
        decode_many(&value)
    }
}

/// Trailing path segment of an href (`/transport-capacities/tc-1` -> `tc-1`)
pub fn id_from_href(href: &str) -> Option<&str> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_one;
    use serde_json::json;

    fn expanded_tc() -> serde_json::Value {
        json!({
            "id": "tc-1",
            "href": "/transport-capacities/tc-1",
            "config": {"capacityMode": "mode100", "labels": {"team": "core"}},
            "state": {
                "name": "tc-one",
                "managedBy": "cm",
                "capacityMode": "mode100",
                "lifecycleState": "configured",
                "lifecycleStateCause": {
                    "action": 2.0,
                    "timestamp": "2024-01-01T00:00:00Z",
                    "traceId": "abc",
                    "errors": [{"code": 7, "message": "retrying"}]
                }
            },
            "endpoints": [
                {
                    "id": "ep-a",
                    "href": "/transport-capacities/tc-1/endpoints/ep-a",
                    "config": {
                        "capacity": 100,
                        "selector": {"moduleIfSelectorByModuleName": {"moduleName": "modA", "moduleClientIfAid": "CIF1"}}
                    },
                    "state": {
                        "capacity": 100.0,
                        "lifecycleState": "configured",
                        "moduleIf": {"moduleId": "m-a", "moduleName": "modA", "clientIfAid": "CIF1", "clientIfColId": 1.0}
                    }
                },
                {
                    "id": "ep-b",
                    "href": "/transport-capacities/tc-1/endpoints/ep-b",
                    "config": {"capacity": 100},
                    "state": {"hostPort": {"hostName": "r1", "hostPortName": "eth0"}}
                }
            ],
            "capacityLinks": [
                {
                    "id": "cl-1",
                    "href": "/capacity-links/cl-1",
                    "state": {
                        "directionality": "biDir",
                        "lifecycleState": "configured",
                        "hubModule": {
                            "moduleId": "m-a",
                            "dscgId": "g1",
                            "dscgCtrl": true,
                            "dscgShared": false,
                            "txCDSCs": [1.0, 2.0],
                            "rxCDSCs": [1, 2],
                            "idleCDSCs": []
                        },
                        "leafModule": {"moduleId": "m-b"}
                    }
                }
            ]
        })
    }

    #[test]
    fn test_decode_expanded_transport_capacity() {
        let tc = TransportCapacity::decode(Node::new(&expanded_tc())).unwrap();

        assert_eq!(tc.id, "tc-1");
        assert_eq!(tc.name.as_deref(), Some("tc-one"));
        assert_eq!(tc.capacity_mode.as_deref(), Some("mode100"));
        assert!(tc.is_configured());
        assert_eq!(tc.labels.get("team").map(String::as_str), Some("core"));

        let cause = tc.lifecycle_state_cause.unwrap();
        assert_eq!(cause.action, Some(2));
        assert_eq!(cause.errors[0].code.as_deref(), Some("7"));

        assert_eq!(tc.endpoints.len(), 2);
        let a = &tc.endpoints[0];
        assert_eq!(a.capacity, Some(100));
        assert_eq!(a.selector.as_ref().map(|s| s.identifier()), Some("modA".to_string()));
        assert_eq!(a.module_if.as_ref().and_then(|m| m.client_if_col_id), Some(1));
        assert!(a.host_port.is_none());

        let b = &tc.endpoints[1];
        assert!(b.selector.is_none());
        assert!(b.lifecycle_state.is_none());
        assert_eq!(b.host_port.as_ref().and_then(|h| h.host_name.as_deref()), Some("r1"));

        let hub = tc.capacity_links[0].hub_module.as_ref().unwrap();
        assert_eq!(hub.tx_cdscs, Some(BTreeSet::from([1, 2])));
        assert_eq!(hub.idle_cdscs, Some(BTreeSet::new()));
        assert_eq!(hub.dscg_ctrl, Some(true));
        let leaf = tc.capacity_links[0].leaf_module.as_ref().unwrap();
        assert_eq!(leaf.tx_cdscs, None);
    }

    #[test]
    fn test_decode_accepts_sequence_response() {
        let value = json!([expanded_tc()]);
        let tc: TransportCapacity = decode_one(&value).unwrap().unwrap();
        assert_eq!(tc.id, "tc-1");
    }

    #[test]
    fn test_missing_identifiers_are_malformed() {
        let value = json!({"href": "/transport-capacities/x"});
        assert!(matches!(
            TransportCapacity::decode(Node::new(&value)),
            Err(IpmError::MalformedResponse(_))
        ));

        let mut tc = expanded_tc();
        tc["endpoints"][0].as_object_mut().unwrap().remove("href");
        assert!(matches!(
            TransportCapacity::decode(Node::new(&tc)),
            Err(IpmError::MalformedResponse(ref m)) if m.contains("transportCapacityEndpoint")
        ));
    }

    #[test]
    fn test_mistyped_nested_field_is_an_error() {
        let mut tc = expanded_tc();
        tc["endpoints"][0]["state"]["moduleIf"]["moduleName"] = json!({"nested": true});
        assert!(matches!(
            TransportCapacity::decode(Node::new(&tc)),
            Err(IpmError::Serialization(_))
        ));
    }

    #[test]
    fn test_id_from_href() {
        assert_eq!(id_from_href("/transport-capacities/tc-1"), Some("tc-1"));
        assert_eq!(id_from_href("/transport-capacities/tc-1/"), Some("tc-1"));
        assert_eq!(id_from_href(""), None);
    }

    #[test]
    fn test_paths() {
        assert_eq!(TransportCapacity::path("tc-1"), "/transport-capacities/tc-1");
        assert_eq!(
            TransportCapacity::endpoint_path("tc-1", "ep-a"),
            "/transport-capacities/tc-1/endpoints/ep-a"
        );
    }
}
