//! IPM API models
//!
//! Top-level entities are decoded through [`crate::decode::Node`], since they
//! merge observed state with declared config. Nested records derive
//! `Deserialize` with `#[serde(default)]`, as the API omits or nulls most
//! fields depending on lifecycle.

mod module;
mod network;
pub mod selector;
mod transport_capacity;

pub use module::{EthernetClient, EthernetClientConfig, Module, MODULES_PATH};
pub use network::{LeafModule, ResolvedModule, XrNetwork, XR_NETWORKS_PATH};
pub use selector::{
    EndpointSelector, HostPortSelectorByName, HostPortSelectorByPortId,
    HostPortSelectorByPortSourceMac, HostPortSelectorBySysName, ModuleIfSelectorByModuleId,
    ModuleIfSelectorByModuleMac, ModuleIfSelectorByModuleName,
    ModuleIfSelectorByModuleSerialNumber,
};
pub use transport_capacity::{
    id_from_href, CapacityLink, CapacityLinkSide, HostPort, LifecycleStateCause, ModuleIf,
    StateError, TransportCapacity, TransportCapacityEndpoint, CAPACITY_LINKS_PATH,
    TRANSPORT_CAPACITIES_PATH,
};

pub const LIFECYCLE_CONFIGURED: &str = "configured";
pub const LIFECYCLE_PENDING_CONFIGURATION: &str = "pendingConfiguration";

/// Capacity mode in which endpoint capacity is server-managed
pub const PORT_MODE: &str = "portMode";

/// `managedBy` value of leaves the host resolved itself
pub const MANAGED_BY_HOST: &str = "host";
