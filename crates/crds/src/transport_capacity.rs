//! IpmTransportCapacity CRD
//!
//! Declares a transport capacity between two endpoints of an IPM-managed
//! optical network.

use ipm_client::{
    EndpointSelector, HostPortSelectorByName, HostPortSelectorByPortId,
    HostPortSelectorByPortSourceMac, HostPortSelectorBySysName, IpmError,
    ModuleIfSelectorByModuleId, ModuleIfSelectorByModuleMac, ModuleIfSelectorByModuleName,
    ModuleIfSelectorByModuleSerialNumber, TransportCapacity,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ipm.microscaler.io",
    version = "v1alpha1",
    kind = "IpmTransportCapacity",
    namespaced,
    status = "IpmTransportCapacityStatus",
    shortname = "itc",
    printcolumn = r#"{"name":"Mode","type":"string","jsonPath":".spec.capacityMode"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Lifecycle","type":"string","jsonPath":".status.lifecycleState"}"#,
    printcolumn = r#"{"name":"Id","type":"string","jsonPath":".status.id"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IpmTransportCapacitySpec {
    /// Display name in IPM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Capacity mode (`portMode`, or a rate mode such as `mode100`)
    pub capacity_mode: String,

    /// Free-form labels copied to the IPM object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Exactly two endpoints
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    /// Requested capacity; ignored in port mode
    #[serde(default)]
    pub capacity: i64,

    /// How the endpoint is identified
    pub selector: EndpointSelectorSpec,
}

/// Endpoint selector as declared on the resource.
///
/// One block per variant keeps the schema structural; exactly one must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSelectorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_if_selector_by_module_id: Option<ModuleIfSelectorByModuleId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_if_selector_by_module_name: Option<ModuleIfSelectorByModuleName>,

    #[serde(
        default,
        rename = "moduleIfSelectorByModuleMAC",
        skip_serializing_if = "Option::is_none"
    )]
    pub module_if_selector_by_module_mac: Option<ModuleIfSelectorByModuleMac>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_if_selector_by_module_serial_number: Option<ModuleIfSelectorByModuleSerialNumber>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port_selector_by_name: Option<HostPortSelectorByName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port_selector_by_port_id: Option<HostPortSelectorByPortId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port_selector_by_sys_name: Option<HostPortSelectorBySysName>,

    #[serde(
        default,
        rename = "hostPortSelectorByPortSourceMAC",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_port_selector_by_port_source_mac: Option<HostPortSelectorByPortSourceMac>,
}

impl TryFrom<&EndpointSelectorSpec> for EndpointSelector {
    type Error = IpmError;

    fn try_from(spec: &EndpointSelectorSpec) -> Result<Self, Self::Error> {
        let mut set: Vec<EndpointSelector> = Vec::with_capacity(1);
        if let Some(s) = &spec.module_if_selector_by_module_id {
            set.push(EndpointSelector::ModuleIfByModuleId(s.clone()));
        }
        if let Some(s) = &spec.module_if_selector_by_module_name {
            set.push(EndpointSelector::ModuleIfByModuleName(s.clone()));
        }
        if let Some(s) = &spec.module_if_selector_by_module_mac {
            set.push(EndpointSelector::ModuleIfByModuleMac(s.clone()));
        }
        if let Some(s) = &spec.module_if_selector_by_module_serial_number {
            set.push(EndpointSelector::ModuleIfByModuleSerialNumber(s.clone()));
        }
        if let Some(s) = &spec.host_port_selector_by_name {
            set.push(EndpointSelector::HostPortByName(s.clone()));
        }
        if let Some(s) = &spec.host_port_selector_by_port_id {
            set.push(EndpointSelector::HostPortByPortId(s.clone()));
        }
        if let Some(s) = &spec.host_port_selector_by_sys_name {
            set.push(EndpointSelector::HostPortBySysName(s.clone()));
        }
        if let Some(s) = &spec.host_port_selector_by_port_source_mac {
            set.push(EndpointSelector::HostPortByPortSourceMac(s.clone()));
        }

        match set.len() {
            1 => Ok(set.remove(0)),
            0 => Err(IpmError::InvalidSelector(
                "endpoint selector has no variant set".to_string(),
            )),
            n => Err(IpmError::InvalidSelector(format!(
                "endpoint selector sets {} variants, exactly one is allowed",
                n
            ))),
        }
    }
}

impl From<&EndpointSelector> for EndpointSelectorSpec {
    fn from(selector: &EndpointSelector) -> Self {
        let mut spec = Self::default();
        match selector.clone() {
            EndpointSelector::ModuleIfByModuleId(s) => spec.module_if_selector_by_module_id = Some(s),
            EndpointSelector::ModuleIfByModuleName(s) => {
                spec.module_if_selector_by_module_name = Some(s)
            }
            EndpointSelector::ModuleIfByModuleMac(s) => spec.module_if_selector_by_module_mac = Some(s),
            EndpointSelector::ModuleIfByModuleSerialNumber(s) => {
                spec.module_if_selector_by_module_serial_number = Some(s)
            }
            EndpointSelector::HostPortByName(s) => spec.host_port_selector_by_name = Some(s),
            EndpointSelector::HostPortByPortId(s) => spec.host_port_selector_by_port_id = Some(s),
            EndpointSelector::HostPortBySysName(s) => spec.host_port_selector_by_sys_name = Some(s),
            EndpointSelector::HostPortByPortSourceMac(s) => {
                spec.host_port_selector_by_port_source_mac = Some(s)
            }
        }
        spec
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpmTransportCapacityStatus {
    /// IPM object id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// IPM object href
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Reconciliation state
    pub state: CapacityState,

    /// IPM lifecycle state (`pendingConfiguration`, `configured`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,

    /// Diagnostic of the last failed reconcile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Observed IPM object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedTransportCapacity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
/// Transport capacity reconciliation state
///
/// Serializes as PascalCase and accepts lowercase on read.
#[serde(rename_all = "PascalCase")]
pub enum CapacityState {
    /// Waiting for IPM to configure the capacity
    #[default]
    #[serde(alias = "pending")]
    Pending,

    /// IPM reports the capacity configured
    #[serde(alias = "configured")]
    Configured,

    /// Last reconcile failed
    #[serde(alias = "failed")]
    Failed,
}

/// Projection of the IPM transport capacity kept in status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObservedTransportCapacity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_mode: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub endpoints: Vec<ObservedEndpoint>,
    #[serde(default)]
    pub capacity_links: Vec<ObservedCapacityLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObservedEndpoint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    /// Selector identifier (`modA`, `router-1:Eth0/1`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObservedCapacityLink {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directionality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,
}

impl From<&TransportCapacity> for ObservedTransportCapacity {
    fn from(tc: &TransportCapacity) -> Self {
        Self {
            name: tc.name.clone(),
            managed_by: tc.managed_by.clone(),
            capacity_mode: tc.capacity_mode.clone(),
            labels: tc.labels.clone(),
            endpoints: tc
                .endpoints
                .iter()
                .map(|ep| ObservedEndpoint {
                    id: ep.id.clone(),
                    capacity: ep.capacity,
                    identifier: ep.selector.as_ref().map(EndpointSelector::identifier),
                    lifecycle_state: ep.lifecycle_state.clone(),
                })
                .collect(),
            capacity_links: tc
                .capacity_links
                .iter()
                .map(|link| ObservedCapacityLink {
                    id: link.id.clone(),
                    directionality: link.directionality.clone(),
                    hub_module_id: link.hub_module.as_ref().and_then(|m| m.module_id.clone()),
                    leaf_module_id: link.leaf_module.as_ref().and_then(|m| m.module_id.clone()),
                    lifecycle_state: link.lifecycle_state.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_deserializes_wire_tags() {
        let spec: IpmTransportCapacitySpec = serde_json::from_value(json!({
            "capacityMode": "mode100",
            "endpoints": [
                {"capacity": 100, "selector": {"moduleIfSelectorByModuleMAC": {"moduleMAC": "00:0b"}}},
                {"capacity": 100, "selector": {"hostPortSelectorByPortSourceMAC": {"portSourceMAC": "aa:bb"}}}
            ]
        }))
        .unwrap();

        let a = EndpointSelector::try_from(&spec.endpoints[0].selector).unwrap();
        assert_eq!(a.identifier(), "00:0b");
        let b = EndpointSelector::try_from(&spec.endpoints[1].selector).unwrap();
        assert_eq!(b.identifier(), "aa:bb");
        assert!(spec.labels.is_empty());
    }

    #[test]
    fn test_selector_spec_requires_exactly_one_block() {
        assert!(matches!(
            EndpointSelector::try_from(&EndpointSelectorSpec::default()),
            Err(IpmError::InvalidSelector(_))
        ));

        let two = EndpointSelectorSpec {
            module_if_selector_by_module_id: Some(Default::default()),
            host_port_selector_by_name: Some(Default::default()),
            ..Default::default()
        };
        assert!(matches!(
            EndpointSelector::try_from(&two),
            Err(IpmError::InvalidSelector(ref m)) if m.contains("2 variants")
        ));
    }

    #[test]
    fn test_selector_spec_round_trip() {
        let selector = EndpointSelector::HostPortBySysName(HostPortSelectorBySysName {
            sys_name: "r2".to_string(),
            port_id_subtype: "interfaceName".to_string(),
            port_id: "Eth0/3".to_string(),
        });
        let spec = EndpointSelectorSpec::from(&selector);
        assert_eq!(EndpointSelector::try_from(&spec).unwrap(), selector);
    }

    #[test]
    fn test_status_state_accepts_lowercase() {
        let status: IpmTransportCapacityStatus =
            serde_json::from_value(json!({"state": "configured", "id": "tc-1"})).unwrap();
        assert_eq!(status.state, CapacityState::Configured);
        assert_eq!(
            serde_json::to_value(&status).unwrap()["state"],
            json!("Configured")
        );
    }

    #[test]
    fn test_crd_manifest_carries_status_and_columns() {
        use kube::CustomResourceExt;

        let crd = serde_json::to_value(IpmTransportCapacity::crd()).unwrap();
        assert_eq!(crd["spec"]["group"], json!("ipm.microscaler.io"));
        assert_eq!(crd["spec"]["names"]["kind"], json!("IpmTransportCapacity"));
        let version = &crd["spec"]["versions"][0];
        assert_eq!(version["subresources"]["status"], json!({}));
        assert_eq!(version["additionalPrinterColumns"][0]["name"], json!("Mode"));
    }
}
