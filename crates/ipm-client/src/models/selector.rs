//! Endpoint selectors
//!
//! A transport-capacity endpoint is attached either to a module client
//! interface (by module id, name, MAC or serial number) or to a host port
//! (by host/port name, chassis+port id, sysName+port id or port source MAC).
//! On the wire the selector is a mapping with exactly one tag key:
//!
//! ```json
//! {"moduleIfSelectorByModuleName": {"moduleName": "modA", "moduleClientIfAid": "XR-T1"}}
//! ```

use crate::decode::Node;
use crate::error::IpmError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MODULE_IF_BY_MODULE_ID: &str = "moduleIfSelectorByModuleId";
pub const MODULE_IF_BY_MODULE_NAME: &str = "moduleIfSelectorByModuleName";
pub const MODULE_IF_BY_MODULE_MAC: &str = "moduleIfSelectorByModuleMAC";
pub const MODULE_IF_BY_MODULE_SERIAL_NUMBER: &str = "moduleIfSelectorByModuleSerialNumber";
pub const HOST_PORT_BY_NAME: &str = "hostPortSelectorByName";
pub const HOST_PORT_BY_PORT_ID: &str = "hostPortSelectorByPortId";
pub const HOST_PORT_BY_SYS_NAME: &str = "hostPortSelectorBySysName";
pub const HOST_PORT_BY_PORT_SOURCE_MAC: &str = "hostPortSelectorByPortSourceMAC";

/// Every endpoint selector tag
pub const SELECTOR_TAGS: [&str; 8] = [
    MODULE_IF_BY_MODULE_ID,
    MODULE_IF_BY_MODULE_NAME,
    MODULE_IF_BY_MODULE_MAC,
    MODULE_IF_BY_MODULE_SERIAL_NUMBER,
    HOST_PORT_BY_NAME,
    HOST_PORT_BY_PORT_ID,
    HOST_PORT_BY_SYS_NAME,
    HOST_PORT_BY_PORT_SOURCE_MAC,
];

/// Module selector tags used by xr-network leaves (no client interface)
const MODULE_SELECTOR_FIELDS: [(&str, &str); 4] = [
    ("moduleSelectorByModuleId", "moduleId"),
    ("moduleSelectorByModuleName", "moduleName"),
    ("moduleSelectorByModuleMAC", "moduleMAC"),
    ("moduleSelectorByModuleSerialNumber", "moduleSerialNumber"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleIfSelectorByModuleId {
    pub module_id: String,
    pub module_client_if_aid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleIfSelectorByModuleName {
    pub module_name: String,
    pub module_client_if_aid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleIfSelectorByModuleMac {
    #[serde(rename = "moduleMAC")]
    pub module_mac: String,
    pub module_client_if_aid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleIfSelectorByModuleSerialNumber {
    pub module_serial_number: String,
    pub module_client_if_aid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct HostPortSelectorByName {
    pub host_name: String,
    pub host_port_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct HostPortSelectorByPortId {
    pub chassis_id_subtype: String,
    pub chassis_id: String,
    pub port_id_subtype: String,
    pub port_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct HostPortSelectorBySysName {
    pub sys_name: String,
    pub port_id_subtype: String,
    pub port_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct HostPortSelectorByPortSourceMac {
    #[serde(rename = "portSourceMAC")]
    pub port_source_mac: String,
}

/// How an endpoint is identified. Exactly one variant by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointSelector {
    #[serde(rename = "moduleIfSelectorByModuleId")]
    ModuleIfByModuleId(ModuleIfSelectorByModuleId),
    #[serde(rename = "moduleIfSelectorByModuleName")]
    ModuleIfByModuleName(ModuleIfSelectorByModuleName),
    #[serde(rename = "moduleIfSelectorByModuleMAC")]
    ModuleIfByModuleMac(ModuleIfSelectorByModuleMac),
    #[serde(rename = "moduleIfSelectorByModuleSerialNumber")]
    ModuleIfByModuleSerialNumber(ModuleIfSelectorByModuleSerialNumber),
    #[serde(rename = "hostPortSelectorByName")]
    HostPortByName(HostPortSelectorByName),
    #[serde(rename = "hostPortSelectorByPortId")]
    HostPortByPortId(HostPortSelectorByPortId),
    #[serde(rename = "hostPortSelectorBySysName")]
    HostPortBySysName(HostPortSelectorBySysName),
    #[serde(rename = "hostPortSelectorByPortSourceMAC")]
    HostPortByPortSourceMac(HostPortSelectorByPortSourceMac),
}

impl EndpointSelector {
    /// Wire tag of the variant
    pub fn tag(&self) -> &'static str {
        match self {
            EndpointSelector::ModuleIfByModuleId(_) => MODULE_IF_BY_MODULE_ID,
            EndpointSelector::ModuleIfByModuleName(_) => MODULE_IF_BY_MODULE_NAME,
            EndpointSelector::ModuleIfByModuleMac(_) => MODULE_IF_BY_MODULE_MAC,
            EndpointSelector::ModuleIfByModuleSerialNumber(_) => MODULE_IF_BY_MODULE_SERIAL_NUMBER,
            EndpointSelector::HostPortByName(_) => HOST_PORT_BY_NAME,
            EndpointSelector::HostPortByPortId(_) => HOST_PORT_BY_PORT_ID,
            EndpointSelector::HostPortBySysName(_) => HOST_PORT_BY_SYS_NAME,
            EndpointSelector::HostPortByPortSourceMac(_) => HOST_PORT_BY_PORT_SOURCE_MAC,
        }
    }

    /// Wire fields of the variant, in declaration order
    fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            EndpointSelector::ModuleIfByModuleId(s) => vec![
                ("moduleId", s.module_id.as_str()),
                ("moduleClientIfAid", s.module_client_if_aid.as_str()),
            ],
            EndpointSelector::ModuleIfByModuleName(s) => vec![
                ("moduleName", s.module_name.as_str()),
                ("moduleClientIfAid", s.module_client_if_aid.as_str()),
            ],
            EndpointSelector::ModuleIfByModuleMac(s) => vec![
                ("moduleMAC", s.module_mac.as_str()),
                ("moduleClientIfAid", s.module_client_if_aid.as_str()),
            ],
            EndpointSelector::ModuleIfByModuleSerialNumber(s) => vec![
                ("moduleSerialNumber", s.module_serial_number.as_str()),
                ("moduleClientIfAid", s.module_client_if_aid.as_str()),
            ],
            EndpointSelector::HostPortByName(s) => vec![
                ("hostName", s.host_name.as_str()),
                ("hostPortName", s.host_port_name.as_str()),
            ],
            EndpointSelector::HostPortByPortId(s) => vec![
                ("chassisIdSubtype", s.chassis_id_subtype.as_str()),
                ("chassisId", s.chassis_id.as_str()),
                ("portIdSubtype", s.port_id_subtype.as_str()),
                ("portId", s.port_id.as_str()),
            ],
            EndpointSelector::HostPortBySysName(s) => vec![
                ("sysName", s.sys_name.as_str()),
                ("portIdSubtype", s.port_id_subtype.as_str()),
                ("portId", s.port_id.as_str()),
            ],
            EndpointSelector::HostPortByPortSourceMac(s) => {
                vec![("portSourceMAC", s.port_source_mac.as_str())]
            }
        }
    }

    /// Encode as `{tag: {field: value, ...}}`. Empty fields are still emitted;
    /// the API validates them.
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let mut selector = Map::new();
        selector.insert(self.tag().to_string(), Value::Object(fields));
        Value::Object(selector)
    }

    /// Decode a selector mapping.
    ///
    /// Missing sub-fields decode as empty strings. Zero or several recognised
    /// tag keys is [`IpmError::InvalidSelector`]; unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, IpmError> {
        let node = Node::new(value);
        let tags: Vec<&str> = node
            .keys()
            .into_iter()
            .filter(|k| SELECTOR_TAGS.contains(k))
            .collect();

        match tags.as_slice() {
            [tag] => Self::from_tag(tag, node.get(tag)).ok_or_else(|| {
                IpmError::InvalidSelector(format!("unrecognised selector tag '{}'", tag))
            }),
            [] => Err(IpmError::InvalidSelector(
                "no selector variant is set".to_string(),
            )),
            many => Err(IpmError::InvalidSelector(format!(
                "selector variants are mutually exclusive, found {}",
                many.join(", ")
            ))),
        }
    }

    /// Build a variant from its tag and (possibly missing) field mapping
    pub fn from_tag(tag: &str, fields: Node<'_>) -> Option<Self> {
        let field = |key: &str| fields.get(key).str().unwrap_or_default();
        let selector = match tag {
            MODULE_IF_BY_MODULE_ID => EndpointSelector::ModuleIfByModuleId(ModuleIfSelectorByModuleId {
                module_id: field("moduleId"),
                module_client_if_aid: field("moduleClientIfAid"),
            }),
            MODULE_IF_BY_MODULE_NAME => {
                EndpointSelector::ModuleIfByModuleName(ModuleIfSelectorByModuleName {
                    module_name: field("moduleName"),
                    module_client_if_aid: field("moduleClientIfAid"),
                })
            }
            MODULE_IF_BY_MODULE_MAC => EndpointSelector::ModuleIfByModuleMac(ModuleIfSelectorByModuleMac {
                module_mac: field("moduleMAC"),
                module_client_if_aid: field("moduleClientIfAid"),
            }),
            MODULE_IF_BY_MODULE_SERIAL_NUMBER => {
                EndpointSelector::ModuleIfByModuleSerialNumber(ModuleIfSelectorByModuleSerialNumber {
                    module_serial_number: field("moduleSerialNumber"),
                    module_client_if_aid: field("moduleClientIfAid"),
                })
            }
            HOST_PORT_BY_NAME => EndpointSelector::HostPortByName(HostPortSelectorByName {
                host_name: field("hostName"),
                host_port_name: field("hostPortName"),
            }),
            HOST_PORT_BY_PORT_ID => EndpointSelector::HostPortByPortId(HostPortSelectorByPortId {
                chassis_id_subtype: field("chassisIdSubtype"),
                chassis_id: field("chassisId"),
                port_id_subtype: field("portIdSubtype"),
                port_id: field("portId"),
            }),
            HOST_PORT_BY_SYS_NAME => EndpointSelector::HostPortBySysName(HostPortSelectorBySysName {
                sys_name: field("sysName"),
                port_id_subtype: field("portIdSubtype"),
                port_id: field("portId"),
            }),
            HOST_PORT_BY_PORT_SOURCE_MAC => {
                EndpointSelector::HostPortByPortSourceMac(HostPortSelectorByPortSourceMac {
                    port_source_mac: field("portSourceMAC"),
                })
            }
            _ => return None,
        };
        Some(selector)
    }

    /// Short identifier used in logs and for matching constellation leaves
    pub fn identifier(&self) -> String {
        match self {
            EndpointSelector::ModuleIfByModuleId(s) => s.module_id.clone(),
            EndpointSelector::ModuleIfByModuleName(s) => s.module_name.clone(),
            EndpointSelector::ModuleIfByModuleMac(s) => s.module_mac.clone(),
            EndpointSelector::ModuleIfByModuleSerialNumber(s) => s.module_serial_number.clone(),
            EndpointSelector::HostPortByName(s) => format!("{}:{}", s.host_name, s.host_port_name),
            EndpointSelector::HostPortByPortId(s) => format!("{}:{}", s.chassis_id, s.port_id),
            EndpointSelector::HostPortBySysName(s) => format!("{}:{}", s.sys_name, s.port_id),
            EndpointSelector::HostPortByPortSourceMac(s) => s.port_source_mac.clone(),
        }
    }

    /// Server-side predicate locating the xr-network whose hub matches this endpoint.
    ///
    /// Module variants match the hub's resolved module; host-port variants match
    /// the hub's declared selector.
    pub fn query_predicate(&self) -> Value {
        let resolved = |key: &str, value: &str| {
            let mut map = Map::new();
            map.insert(
                format!("hubModule.state.module.{}", key),
                Value::String(value.to_string()),
            );
            Value::Object(map)
        };

        match self {
            EndpointSelector::ModuleIfByModuleId(s) => resolved("moduleId", &s.module_id),
            EndpointSelector::ModuleIfByModuleName(s) => resolved("moduleName", &s.module_name),
            EndpointSelector::ModuleIfByModuleMac(s) => resolved("macAddress", &s.module_mac),
            EndpointSelector::ModuleIfByModuleSerialNumber(s) => {
                resolved("serialNumber", &s.module_serial_number)
            }
            _ => {
                let tag = self.tag();
                let map: Map<String, Value> = self
                    .fields()
                    .into_iter()
                    .map(|(k, v)| {
                        (
                            format!("hubModule.config.selector.{}.{}", tag, k),
                            Value::String(v.to_string()),
                        )
                    })
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Reject selectors whose identifying fields are empty
    pub fn validate(&self) -> Result<(), IpmError> {
        let required: Vec<(&str, &String)> = match self {
            EndpointSelector::ModuleIfByModuleId(s) => vec![("moduleId", &s.module_id)],
            EndpointSelector::ModuleIfByModuleName(s) => vec![("moduleName", &s.module_name)],
            EndpointSelector::ModuleIfByModuleMac(s) => vec![("moduleMAC", &s.module_mac)],
            EndpointSelector::ModuleIfByModuleSerialNumber(s) => {
                vec![("moduleSerialNumber", &s.module_serial_number)]
            }
            EndpointSelector::HostPortByName(s) => {
                vec![("hostName", &s.host_name), ("hostPortName", &s.host_port_name)]
            }
            EndpointSelector::HostPortByPortId(s) => {
                vec![("chassisId", &s.chassis_id), ("portId", &s.port_id)]
            }
            EndpointSelector::HostPortBySysName(s) => {
                vec![("sysName", &s.sys_name), ("portId", &s.port_id)]
            }
            EndpointSelector::HostPortByPortSourceMac(s) => {
                vec![("portSourceMAC", &s.port_source_mac)]
            }
        };

        match required.iter().find(|(_, v)| v.is_empty()) {
            Some((field, _)) => Err(IpmError::InvalidSelector(format!(
                "{}.{} must not be empty",
                self.tag(),
                field
            ))),
            None => Ok(()),
        }
    }

    /// The module-by-name variant, used by the compound import lookup
    pub fn as_module_if_by_name(&self) -> Option<&ModuleIfSelectorByModuleName> {
        match self {
            EndpointSelector::ModuleIfByModuleName(s) => Some(s),
            _ => None,
        }
    }
}

/// Identifier a constellation leaf's declared selector resolves to.
///
/// Accepts the eight endpoint tags as well as the module selector tags that
/// xr-network leaves carry.
pub fn candidate_identifier(tag: &str, fields: Node<'_>) -> Option<String> {
    if let Some(selector) = EndpointSelector::from_tag(tag, fields) {
        return Some(selector.identifier());
    }
    MODULE_SELECTOR_FIELDS
        .iter()
        .find(|(t, _)| *t == tag)
        .and_then(|(_, key)| fields.get(key).str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_variants() -> Vec<EndpointSelector> {
        vec![
            EndpointSelector::ModuleIfByModuleId(ModuleIfSelectorByModuleId {
                module_id: "5f1c".to_string(),
                module_client_if_aid: "XR-T1".to_string(),
            }),
            EndpointSelector::ModuleIfByModuleName(ModuleIfSelectorByModuleName {
                module_name: "modA".to_string(),
                module_client_if_aid: "XR-T1".to_string(),
            }),
            EndpointSelector::ModuleIfByModuleMac(ModuleIfSelectorByModuleMac {
                module_mac: "00:0b:f8:00:01:02".to_string(),
                module_client_if_aid: "XR-T2".to_string(),
            }),
            EndpointSelector::ModuleIfByModuleSerialNumber(ModuleIfSelectorByModuleSerialNumber {
                module_serial_number: "SN123".to_string(),
                module_client_if_aid: "XR-T3".to_string(),
            }),
            EndpointSelector::HostPortByName(HostPortSelectorByName {
                host_name: "router-1".to_string(),
                host_port_name: "Eth0/1".to_string(),
            }),
            EndpointSelector::HostPortByPortId(HostPortSelectorByPortId {
                chassis_id_subtype: "macAddress".to_string(),
                chassis_id: "aa:bb:cc:dd:ee:ff".to_string(),
                port_id_subtype: "interfaceName".to_string(),
                port_id: "Eth0/2".to_string(),
            }),
            EndpointSelector::HostPortBySysName(HostPortSelectorBySysName {
                sys_name: "router-2".to_string(),
                port_id_subtype: "interfaceName".to_string(),
                port_id: "Eth0/3".to_string(),
            }),
            EndpointSelector::HostPortByPortSourceMac(HostPortSelectorByPortSourceMac {
                port_source_mac: "11:22:33:44:55:66".to_string(),
            }),
        ]
    }

    fn minimal_variants() -> Vec<EndpointSelector> {
        vec![
            EndpointSelector::ModuleIfByModuleId(Default::default()),
            EndpointSelector::ModuleIfByModuleName(Default::default()),
            EndpointSelector::ModuleIfByModuleMac(Default::default()),
            EndpointSelector::ModuleIfByModuleSerialNumber(Default::default()),
            EndpointSelector::HostPortByName(Default::default()),
            EndpointSelector::HostPortByPortId(Default::default()),
            EndpointSelector::HostPortBySysName(Default::default()),
            EndpointSelector::HostPortByPortSourceMac(Default::default()),
        ]
    }

    #[test]
    fn test_round_trip_all_variants() {
        for selector in full_variants().into_iter().chain(minimal_variants()) {
            let encoded = selector.to_json();
            assert_eq!(encoded.as_object().map(|m| m.len()), Some(1));
            let decoded = EndpointSelector::from_json(&encoded).unwrap();
            assert_eq!(decoded, selector, "round trip of {}", selector.tag());
        }
    }

    #[test]
    fn test_serde_matches_manual_encoding() {
        for selector in full_variants() {
            assert_eq!(serde_json::to_value(&selector).unwrap(), selector.to_json());
        }
    }

    #[test]
    fn test_empty_fields_are_emitted() {
        let encoded = EndpointSelector::HostPortByPortId(Default::default()).to_json();
        assert_eq!(
            encoded,
            json!({"hostPortSelectorByPortId": {
                "chassisIdSubtype": "", "chassisId": "", "portIdSubtype": "", "portId": ""
            }})
        );
    }

    #[test]
    fn test_identifiers() {
        let ids: Vec<String> = full_variants().iter().map(EndpointSelector::identifier).collect();
        assert_eq!(
            ids,
            vec![
                "5f1c",
                "modA",
                "00:0b:f8:00:01:02",
                "SN123",
                "router-1:Eth0/1",
                "aa:bb:cc:dd:ee:ff:Eth0/2",
                "router-2:Eth0/3",
                "11:22:33:44:55:66",
            ]
        );
    }

    #[test]
    fn test_decode_rejects_two_variants() {
        let value = json!({
            "moduleIfSelectorByModuleName": {"moduleName": "a"},
            "moduleIfSelectorByModuleId": {"moduleId": "b"}
        });
        assert!(matches!(
            EndpointSelector::from_json(&value),
            Err(IpmError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_decode_rejects_no_variant() {
        assert!(EndpointSelector::from_json(&json!({})).is_err());
        assert!(EndpointSelector::from_json(&json!({"somethingElse": {}})).is_err());
        assert!(EndpointSelector::from_json(&Value::Null).is_err());
    }

    #[test]
    fn test_decode_is_tolerant() {
        let value = json!({
            "moduleIfSelectorByModuleName": {"moduleName": "modB", "moduleClientIfAid": null},
            "unrelated": true
        });
        let selector = EndpointSelector::from_json(&value).unwrap();
        assert_eq!(
            selector,
            EndpointSelector::ModuleIfByModuleName(ModuleIfSelectorByModuleName {
                module_name: "modB".to_string(),
                module_client_if_aid: String::new(),
            })
        );
    }

    #[test]
    fn test_query_predicates() {
        let variants = full_variants();
        assert_eq!(
            variants[1].query_predicate(),
            json!({"hubModule.state.module.moduleName": "modA"})
        );
        assert_eq!(
            variants[2].query_predicate(),
            json!({"hubModule.state.module.macAddress": "00:0b:f8:00:01:02"})
        );
        assert_eq!(
            variants[3].query_predicate(),
            json!({"hubModule.state.module.serialNumber": "SN123"})
        );
        assert_eq!(
            variants[4].query_predicate(),
            json!({
                "hubModule.config.selector.hostPortSelectorByName.hostName": "router-1",
                "hubModule.config.selector.hostPortSelectorByName.hostPortName": "Eth0/1"
            })
        );
        assert_eq!(
            variants[7].query_predicate(),
            json!({"hubModule.config.selector.hostPortSelectorByPortSourceMAC.portSourceMAC": "11:22:33:44:55:66"})
        );
    }

    #[test]
    fn test_validate_requires_identifying_fields() {
        for selector in full_variants() {
            assert!(selector.validate().is_ok());
        }
        for selector in minimal_variants() {
            assert!(selector.validate().is_err(), "{} should be rejected", selector.tag());
        }
        let no_aid = EndpointSelector::ModuleIfByModuleName(ModuleIfSelectorByModuleName {
            module_name: "modA".to_string(),
            module_client_if_aid: String::new(),
        });
        assert!(no_aid.validate().is_ok());
    }

    #[test]
    fn test_candidate_identifier_for_leaf_selectors() {
        let leaf = json!({"moduleSelectorByModuleName": {"moduleName": "leaf-1"}});
        let node = Node::new(&leaf);
        assert_eq!(
            candidate_identifier("moduleSelectorByModuleName", node.get("moduleSelectorByModuleName")),
            Some("leaf-1".to_string())
        );

        let host = json!({"hostPortSelectorByName": {"hostName": "h", "hostPortName": "p"}});
        let node = Node::new(&host);
        assert_eq!(
            candidate_identifier("hostPortSelectorByName", node.get("hostPortSelectorByName")),
            Some("h:p".to_string())
        );
        assert_eq!(candidate_identifier("bogus", Node::missing()), None);
    }
}
