//! Modules and their Ethernet client interfaces
//!
//! Read-only projections of passive entities. They carry no reconcile logic,
//! only fetch-and-decode plus the Ethernet client config update.

use crate::decode::{decode_one, lenient, Decode, Node};
use crate::error::IpmError;
use crate::ipm_trait::IpmClientTrait;
use crate::common::query::expanded;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Collection path of modules
pub const MODULES_PATH: &str = "/modules";

/// Optical module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub href: String,
    pub module_name: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub current_role: Option<String>,
    pub traffic_mode: Option<String>,
    pub lifecycle_state: Option<String>,
}

impl Decode for Module {
    const ENTITY: &'static str = "module";

    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        let module = node.path("state.module");
        Ok(Self {
            id: node.required_str("id", Self::ENTITY)?,
            href: node.required_str("href", Self::ENTITY)?,
            module_name: module.get("moduleName").str(),
            mac_address: module.get("macAddress").str(),
            serial_number: module.get("serialNumber").str(),
            current_role: module.get("currentRole").str(),
            traffic_mode: module.get("trafficMode").str(),
            lifecycle_state: node.path("state.lifecycleState").str(),
        })
    }
}

impl Module {
    /// GET `/modules/{id}?content=expanded`
    pub async fn fetch(client: &dyn IpmClientTrait, id: &str) -> Result<Self, IpmError> {
        let path = expanded(&format!("{}/{}", MODULES_PATH, id));
        debug!("Fetching module {}", id);
        let value = client.get_json(&path).await?;
        decode_one(&value)?.ok_or_else(|| {
            IpmError::MalformedResponse(format!("module {} returned an empty response", id))
        })
    }
}

/// Declared configuration of an Ethernet client interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EthernetClientConfig {
    pub fec_iana: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub mtu: Option<i64>,
    pub loopback_type: Option<String>,
    pub lldp_admin_status: Option<String>,
}

impl EthernetClientConfig {
    /// PUT body for moving `current` towards `desired`.
    ///
    /// Only fields the server currently reports (non-null in `current`) are
    /// written; a field that is unset on the server is never sent, even when
    /// `desired` sets it.
    pub fn update_body(current: &Self, desired: &Self) -> Map<String, Value> {
        let mut body = Map::new();
        if let (Some(_), Some(v)) = (&current.fec_iana, &desired.fec_iana) {
            body.insert("fecIana".to_string(), Value::from(v.clone()));
        }
        if let (Some(_), Some(v)) = (current.mtu, desired.mtu) {
            body.insert("mtu".to_string(), Value::from(v));
        }
        if let (Some(_), Some(v)) = (&current.loopback_type, &desired.loopback_type) {
            body.insert("loopbackType".to_string(), Value::from(v.clone()));
        }
        if let (Some(_), Some(v)) = (&current.lldp_admin_status, &desired.lldp_admin_status) {
            body.insert("lldpAdminStatus".to_string(), Value::from(v.clone()));
        }
        body
    }
}

/// Ethernet client interface of a module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthernetClient {
    pub id: String,
    pub href: String,
    pub parent_id: String,
    pub col_id: i64,
    pub aid: Option<String>,
    pub parent_aid: Option<String>,
    pub config: EthernetClientConfig,
    pub lifecycle_state: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EthernetClientState {
    aid: Option<String>,
    #[serde(deserialize_with = "lenient::parent_aid")]
    parent_aid: Option<String>,
    lifecycle_state: Option<String>,
}

impl Decode for EthernetClient {
    const ENTITY: &'static str = "ethernetClient";

    fn decode(node: Node<'_>) -> Result<Self, IpmError> {
        let col_id = node.get("colId").int().ok_or_else(|| {
            IpmError::MalformedResponse(format!("{} response is missing 'colId'", Self::ENTITY))
        })?;
        let state: EthernetClientState = node.get("state").record()?.unwrap_or_default();
        Ok(Self {
            id: node.required_str("id", Self::ENTITY)?,
            href: node.required_str("href", Self::ENTITY)?,
            parent_id: node.required_str("parentId", Self::ENTITY)?,
            col_id,
            aid: state.aid,
            parent_aid: state.parent_aid,
            config: node.get("config").record()?.unwrap_or_default(),
            lifecycle_state: state.lifecycle_state,
        })
    }
}

impl EthernetClient {
    pub fn path(module_id: &str, eclient_id: &str) -> String {
        format!("{}/{}/ethernets/{}", MODULES_PATH, module_id, eclient_id)
    }

    /// GET `/modules/{mid}/ethernets/{eid}?content=expanded`.
    ///
    /// The server answers with an object or a one-element sequence.
    pub async fn fetch(
        client: &dyn IpmClientTrait,
        module_id: &str,
        eclient_id: &str,
    ) -> Result<Self, IpmError> {
        let path = expanded(&Self::path(module_id, eclient_id));
        debug!("Fetching ethernet client {}/{}", module_id, eclient_id);
        let value = client.get_json(&path).await?;
        decode_one(&value)?.ok_or_else(|| {
            IpmError::MalformedResponse(format!(
                "ethernet client {}/{} returned an empty response",
                module_id, eclient_id
            ))
        })
    }

    /// PUT a config body built with [`EthernetClientConfig::update_body`].
    /// An empty body is not sent.
    pub async fn update(
        client: &dyn IpmClientTrait,
        module_id: &str,
        eclient_id: &str,
        body: Map<String, Value>,
    ) -> Result<bool, IpmError> {
        if body.is_empty() {
            debug!("No ethernet client changes for {}/{}", module_id, eclient_id);
            return Ok(false);
        }
        client
            .put_json(&Self::path(module_id, eclient_id), &Value::Object(body))
            .await?;
        Ok(true)
    }
}
