use crate::{
    endpoint::{AddressEndpointKey, ContainmentEndpointKey},
    NodeConnectorId, NodeId,
};
use serde::{Deserialize, Serialize};

/// A location on a node managed by this domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InternalLocation {
    pub internal_node: NodeId,
    #[serde(default)]
    pub internal_node_connector: Option<NodeConnectorId>,
}

/// A location behind the mount point of an external node (e.g. a gateway).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExternalLocation {
    pub external_node_mount_point: NodeId,
    #[serde(default)]
    pub external_node_connector: Option<NodeConnectorId>,
}

/// The node that owns an endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsoluteLocation {
    Internal(InternalLocation),
    External(ExternalLocation),
}

/// Indirect reachability of an endpoint, used when it is not owned by a single node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelativeLocations {
    #[serde(default)]
    pub internal_locations: Vec<InternalLocation>,
    #[serde(default)]
    pub external_locations: Vec<ExternalLocation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressEndpointLocation {
    #[serde(flatten)]
    pub key: AddressEndpointKey,
    #[serde(default)]
    pub absolute_location: Option<AbsoluteLocation>,
    #[serde(default)]
    pub relative_locations: Option<RelativeLocations>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainmentEndpointLocation {
    #[serde(flatten)]
    pub key: ContainmentEndpointKey,
    #[serde(default)]
    pub relative_locations: Option<RelativeLocations>,
}

/// The endpoint-locations collection, as published by location providers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointLocations {
    #[serde(default)]
    pub address_endpoint_locations: Vec<AddressEndpointLocation>,
    #[serde(default)]
    pub containment_endpoint_locations: Vec<ContainmentEndpointLocation>,
}

// === impl AbsoluteLocation ===

impl AbsoluteLocation {
    pub fn internal(node: impl Into<NodeId>) -> Self {
        Self::Internal(InternalLocation {
            internal_node: node.into(),
            internal_node_connector: None,
        })
    }

    pub fn external(mount_point: impl Into<NodeId>) -> Self {
        Self::External(ExternalLocation {
            external_node_mount_point: mount_point.into(),
            external_node_connector: None,
        })
    }

    /// The internal node or external mount point that owns the endpoint.
    pub fn node(&self) -> &NodeId {
        match self {
            Self::Internal(loc) => &loc.internal_node,
            Self::External(loc) => &loc.external_node_mount_point,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

// === impl RelativeLocations ===

impl RelativeLocations {
    pub fn is_empty(&self) -> bool {
        self.internal_locations.is_empty() && self.external_locations.is_empty()
    }

    pub fn external_mount_points(&self) -> impl Iterator<Item = &NodeId> {
        self.external_locations
            .iter()
            .map(|loc| &loc.external_node_mount_point)
    }
}
