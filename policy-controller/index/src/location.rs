use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use gbp_policy_controller_core::{
    endpoint::{AddressEndpointKey, ContainmentEndpointKey},
    location::{
        AbsoluteLocation, AddressEndpointLocation, ContainmentEndpointLocation, EndpointLocations,
    },
    NodeId,
};

/// Indexes where each endpoint currently resides.
///
/// An endpoint may have an absolute location (the node that owns it), relative locations
/// (indirect reachability, e.g. behind an external gateway), both, or neither. An endpoint with
/// no location at all is not routable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointLocationInfo {
    address_by_key: HashMap<AddressEndpointKey, AddressEndpointLocation>,
    containment_by_key: HashMap<ContainmentEndpointKey, ContainmentEndpointLocation>,
    address_by_absolute_node: HashMap<NodeId, HashSet<AddressEndpointKey>>,
}

// === impl EndpointLocationInfo ===

impl EndpointLocationInfo {
    pub fn new(locations: &EndpointLocations) -> Self {
        let address_by_key = locations
            .address_endpoint_locations
            .iter()
            .map(|loc| (loc.key.clone(), loc.clone()))
            .collect::<HashMap<_, _>>();
        let containment_by_key = locations
            .containment_endpoint_locations
            .iter()
            .map(|loc| (loc.key.clone(), loc.clone()))
            .collect::<HashMap<_, _>>();

        let mut address_by_absolute_node =
            HashMap::<NodeId, HashSet<AddressEndpointKey>>::default();
        for loc in address_by_key.values() {
            if let Some(absolute) = loc.absolute_location.as_ref() {
                address_by_absolute_node
                    .entry(absolute.node().clone())
                    .or_default()
                    .insert(loc.key.clone());
            }
        }

        Self {
            address_by_key,
            containment_by_key,
            address_by_absolute_node,
        }
    }

    pub fn address_endpoint_location(
        &self,
        key: &AddressEndpointKey,
    ) -> Option<&AddressEndpointLocation> {
        self.address_by_key.get(key)
    }

    pub fn containment_endpoint_location(
        &self,
        key: &ContainmentEndpointKey,
    ) -> Option<&ContainmentEndpointLocation> {
        self.containment_by_key.get(key)
    }

    /// Returns the endpoint's absolute location, which distinguishes internal nodes from
    /// external mount points.
    pub fn absolute_location(&self, key: &AddressEndpointKey) -> Option<&AbsoluteLocation> {
        self.address_by_key.get(key)?.absolute_location.as_ref()
    }

    /// Returns the node (internal node or external mount point) that owns the endpoint.
    pub fn absolute_node(&self, key: &AddressEndpointKey) -> Option<&NodeId> {
        self.absolute_location(key).map(AbsoluteLocation::node)
    }

    pub fn has_absolute_location(&self, key: &AddressEndpointKey) -> bool {
        self.absolute_location(key).is_some()
    }

    pub fn has_relative_location(&self, key: &AddressEndpointKey) -> bool {
        self.address_by_key
            .get(key)
            .and_then(|loc| loc.relative_locations.as_ref())
            .map_or(false, |rel| !rel.is_empty())
    }

    /// Indicates whether the endpoint is reachable at all.
    pub fn has_location(&self, key: &AddressEndpointKey) -> bool {
        self.has_absolute_location(key) || self.has_relative_location(key)
    }

    /// A containment endpoint is only located through internal relative locations.
    pub fn containment_has_relative_location(&self, key: &ContainmentEndpointKey) -> bool {
        self.containment_by_key
            .get(key)
            .and_then(|loc| loc.relative_locations.as_ref())
            .map_or(false, |rel| !rel.internal_locations.is_empty())
    }

    /// Returns all nodes that own at least one address endpoint.
    pub fn absolute_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.address_by_absolute_node.keys()
    }

    pub fn address_endpoints_at_node<'a>(
        &'a self,
        node: &NodeId,
    ) -> impl Iterator<Item = &'a AddressEndpointKey> + 'a {
        self.address_by_absolute_node.get(node).into_iter().flatten()
    }

    pub fn address_locations_len(&self) -> usize {
        self.address_by_key.len()
    }
}
