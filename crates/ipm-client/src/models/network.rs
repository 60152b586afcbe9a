//! XR networks (constellations) as seen by the precondition check

use super::selector::candidate_identifier;
use super::{LIFECYCLE_CONFIGURED, LIFECYCLE_PENDING_CONFIGURATION, MANAGED_BY_HOST};
use crate::decode::{Decode, Node};
use crate::error::IpmError;
use serde::{Deserialize, Serialize};

/// Collection path of xr-networks
pub const XR_NETWORKS_PATH: &str = "/xr-networks";

/// Module a leaf resolved to on the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolvedModule {
    pub module_id: Option<String>,
    pub module_name: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
}

impl ResolvedModule {
    fn identities(&self) -> impl Iterator<Item = &str> {
        [
            &self.module_id,
            &self.module_name,
            &self.mac_address,
            &self.serial_number,
        ]
        .into_iter()
        .filter_map(|v| v.as_deref())
    }
}

/// Leaf module of a constellation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafModule {
    pub lifecycle_state: Option<String>,
    pub managed_by: Option<String>,
    /// Identifiers derived from the leaf's declared selector
    pub selector_identifiers: Vec<String>,
    pub module: Option<ResolvedModule>,
}

impl LeafModule {
    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        let selector = node.path("config.selector");
        let selector_identifiers = selector
            .keys()
            .into_iter()
            .filter_map(|tag| candidate_identifier(tag, selector.get(tag)))
            .collect();

        Ok(Self {
            lifecycle_state: node.path("state.lifecycleState").str(),
            managed_by: node.path("config.managedBy").str(),
            selector_identifiers,
            module: node.path("state.module").record()?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.lifecycle_state.as_deref() == Some(LIFECYCLE_CONFIGURED)
    }

    pub fn is_host_managed(&self) -> bool {
        self.managed_by.as_deref() == Some(MANAGED_BY_HOST)
    }

    /// True when this configured leaf identifies one of `ids`.
    ///
    /// Host-managed leaves are matched on their resolved module, all others
    /// on their declared selector.
    pub fn matches(&self, ids: &[&str]) -> bool {
        if !self.is_configured() {
            return false;
        }
        if self.is_host_managed() {
            self.module
                .as_ref()
                .map(|m| m.identities().any(|v| ids.contains(&v)))
                .unwrap_or(false)
        } else {
            self.selector_identifiers
                .iter()
                .any(|v| ids.contains(&v.as_str()))
        }
    }
}

/// Constellation containing a hub and its leaves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XrNetwork {
    pub id: Option<String>,
    pub name: Option<String>,
    pub lifecycle_state: Option<String>,
    pub leaf_modules: Vec<LeafModule>,
}

impl Decode for XrNetwork {
    const ENTITY: &'static str = "xrNetwork";

    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        let name = node.path("state.name");
        Ok(Self {
            id: node.get("id").str(),
            name: if name.is_present() {
                name.str()
            } else {
                node.path("config.name").str()
            },
            lifecycle_state: node.path("state.lifecycleState").str(),
            leaf_modules: node
                .get("leafModules")
                .items()
                .into_iter()
                .map(LeafModule::decode)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

impl XrNetwork {
    /// Constellation is `configured` or `pendingConfiguration`
    pub fn is_ready(&self) -> bool {
        matches!(
            self.lifecycle_state.as_deref(),
            Some(LIFECYCLE_CONFIGURED) | Some(LIFECYCLE_PENDING_CONFIGURATION)
        )
    }

    /// Any leaf matches one of the endpoint identifiers
    pub fn has_matching_leaf(&self, ids: &[&str]) -> bool {
        self.leaf_modules.iter().any(|leaf| leaf.matches(ids))
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn network() -> serde_json::Value {
        json!({
            "id": "net-1",
            "config": {"name": "cfg-name"},
            "state": {"name": "XR-1", "lifecycleState": "configured"},
            "leafModules": [
                {
                    "config": {
                        "managedBy": "cm",
                        "selector": {"moduleSelectorByModuleName": {"moduleName": "modB"}}
                    },
                    "state": {"lifecycleState": "configured", "module": {"moduleName": "resolved-b"}}
                },
                {
                    "config": {"managedBy": "host", "selector": {}},
                    "state": {
                        "lifecycleState": "configured",
                        "module": {"moduleId": "m-c", "macAddress": "00:11", "serialNumber": "SN-C"}
                    }
                },
                {
                    "config": {
                        "managedBy": "cm",
                        "selector": {"moduleSelectorByModuleName": {"moduleName": "modD"}}
                    },
                    "state": {"lifecycleState": "pendingConfiguration"}
                }
            ]
        })
    }

    #[test]
    fn test_decode_network() {
        let net = XrNetwork::decode(Node::new(&network())).unwrap();
        assert_eq!(net.display_name(), "XR-1");
        assert!(net.is_ready());
        assert_eq!(net.leaf_modules.len(), 3);
        assert_eq!(net.leaf_modules[0].selector_identifiers, vec!["modB".to_string()]);
        assert!(net.leaf_modules[1].is_host_managed());
    }

    #[test]
    fn test_selector_managed_leaf_matches_on_selector() {
        let net = XrNetwork::decode(Node::new(&network())).unwrap();
        assert!(net.leaf_modules[0].matches(&["modA", "modB"]));
        // the resolved name is ignored for controller-managed leaves
        assert!(!net.leaf_modules[0].matches(&["resolved-b"]));
    }

    #[test]
    fn test_host_managed_leaf_matches_on_resolved_module() {
        let net = XrNetwork::decode(Node::new(&network())).unwrap();
        assert!(net.leaf_modules[1].matches(&["x", "SN-C"]));
        assert!(net.leaf_modules[1].matches(&["00:11", "x"]));
        assert!(!net.leaf_modules[1].matches(&["x", "y"]));
    }

    #[test]
    fn test_unconfigured_leaf_never_matches() {
        let net = XrNetwork::decode(Node::new(&network())).unwrap();
        assert!(!net.leaf_modules[2].matches(&["modD"]));
    }

    #[test]
    fn test_name_falls_back_to_config() {
        let value = json!({"config": {"name": "cfg-name"}, "state": {"lifecycleState": "unknown"}});
        let net = XrNetwork::decode(Node::new(&value)).unwrap();
        assert_eq!(net.display_name(), "cfg-name");
        assert!(!net.is_ready());
        assert!(!net.has_matching_leaf(&["a"]));
    }
}
