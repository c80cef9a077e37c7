use crate::{
    AugmentorRegistry, EndpointInfo, EndpointLocationInfo, RendererTopology, ResolvedPolicyInfo,
};
use gbp_policy_controller_core::{
    endpoint::{AddressEndpointKey, ContainmentEndpointKey},
    forwarding::Forwarding,
    location::AddressEndpointLocation,
    policy::{Participation, PolicyRuleGroup, RuleGroupKey},
    renderer::{
        AddressEndpointWithLocation, Configuration, ContainmentEndpointWithLocation,
        EndpointsWithLocation, PeerContainmentEndpoint, PeerEndpoint, RendererEndpoint,
        RendererForwarding, RendererForwardingByTenant, RendererNetworkDomain,
        RuleGroupWithParticipation,
    },
    RendererName,
};
use std::collections::{BTreeMap, BTreeSet};

/// The augmentation name under which an endpoint's NAT address is emitted.
const NAT_ADDRESS: &str = "nat-address";

type RelationTable<P> =
    BTreeMap<AddressEndpointKey, BTreeMap<P, BTreeSet<RuleGroupWithParticipation>>>;

/// A configuration could not be built because the snapshot does not hold a key referenced by the
/// accumulated relations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("address endpoint {0} not found")]
    MissingAddressEndpoint(AddressEndpointKey),

    #[error("address endpoint {0} has no location")]
    MissingAddressEndpointLocation(AddressEndpointKey),

    #[error("containment endpoint {0} not found")]
    MissingContainmentEndpoint(ContainmentEndpointKey),

    #[error("containment endpoint {0} has no location")]
    MissingContainmentEndpointLocation(ContainmentEndpointKey),

    #[error("rule group {0} not found")]
    MissingRuleGroup(RuleGroupKey),
}

/// Accumulates the relations of one renderer's endpoints and materializes its configuration.
///
/// All tables are ordered so that the emitted configuration is independent of the order in which
/// relations were added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RendererConfigurationBuilder {
    peers: RelationTable<AddressEndpointKey>,
    external_peers: RelationTable<AddressEndpointKey>,
    external_containment_peers: RelationTable<ContainmentEndpointKey>,

    address_endpoints: BTreeSet<AddressEndpointKey>,
    containment_endpoints: BTreeSet<ContainmentEndpointKey>,
    rule_groups: BTreeSet<RuleGroupKey>,
}

// === impl RendererConfigurationBuilder ===

impl RendererConfigurationBuilder {
    /// Records that `rule_group` governs the relation between a renderer endpoint and a peer
    /// located in the managed domain.
    pub fn add_peer(
        &mut self,
        endpoint: &AddressEndpointKey,
        peer: &AddressEndpointKey,
        rule_group: &RuleGroupKey,
        participation: Participation,
    ) {
        let groups = Self::cell(&mut self.peers, endpoint, peer);
        if groups.is_empty() {
            self.address_endpoints.insert(endpoint.clone());
            self.address_endpoints.insert(peer.clone());
        }
        groups.insert(with_participation(rule_group, participation));
        self.rule_groups.insert(rule_group.clone());
    }

    /// Records a relation with a peer that is logically outside of the managed domain.
    pub fn add_peer_external(
        &mut self,
        endpoint: &AddressEndpointKey,
        peer: &AddressEndpointKey,
        rule_group: &RuleGroupKey,
        participation: Participation,
    ) {
        let groups = Self::cell(&mut self.external_peers, endpoint, peer);
        if groups.is_empty() {
            self.address_endpoints.insert(endpoint.clone());
            self.address_endpoints.insert(peer.clone());
        }
        groups.insert(with_participation(rule_group, participation));
        self.rule_groups.insert(rule_group.clone());
    }

    /// Records a relation with an external containment endpoint.
    pub fn add_peer_external_containment(
        &mut self,
        endpoint: &AddressEndpointKey,
        peer: &ContainmentEndpointKey,
        rule_group: &RuleGroupKey,
        participation: Participation,
    ) {
        let groups = Self::cell(&mut self.external_containment_peers, endpoint, peer);
        if groups.is_empty() {
            self.address_endpoints.insert(endpoint.clone());
            self.containment_endpoints.insert(peer.clone());
        }
        groups.insert(with_participation(rule_group, participation));
        self.rule_groups.insert(rule_group.clone());
    }

    fn cell<'t, P: Ord + Clone>(
        table: &'t mut RelationTable<P>,
        endpoint: &AddressEndpointKey,
        peer: &P,
    ) -> &'t mut BTreeSet<RuleGroupWithParticipation> {
        table
            .entry(endpoint.clone())
            .or_default()
            .entry(peer.clone())
            .or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
            && self.external_peers.is_empty()
            && self.external_containment_peers.is_empty()
    }

    /// Returns the rule groups recorded between `endpoint` and the in-domain `peer`.
    pub fn peer_rule_groups(
        &self,
        endpoint: &AddressEndpointKey,
        peer: &AddressEndpointKey,
    ) -> Option<&BTreeSet<RuleGroupWithParticipation>> {
        self.peers.get(endpoint)?.get(peer)
    }

    pub fn external_peer_rule_groups(
        &self,
        endpoint: &AddressEndpointKey,
        peer: &AddressEndpointKey,
    ) -> Option<&BTreeSet<RuleGroupWithParticipation>> {
        self.external_peers.get(endpoint)?.get(peer)
    }

    pub fn external_containment_peer_rule_groups(
        &self,
        endpoint: &AddressEndpointKey,
        peer: &ContainmentEndpointKey,
    ) -> Option<&BTreeSet<RuleGroupWithParticipation>> {
        self.external_containment_peers.get(endpoint)?.get(peer)
    }

    pub fn address_endpoint_keys(&self) -> &BTreeSet<AddressEndpointKey> {
        &self.address_endpoints
    }

    pub fn containment_endpoint_keys(&self) -> &BTreeSet<ContainmentEndpointKey> {
        &self.containment_endpoints
    }

    pub fn rule_group_keys(&self) -> &BTreeSet<RuleGroupKey> {
        &self.rule_groups
    }

    /// Emits one record per renderer endpoint listing all of its peer relations.
    pub fn build_renderer_endpoints(&self) -> Vec<RendererEndpoint> {
        self.renderer_endpoints(|_| true)
    }

    /// Emits the renderer endpoint records, omitting every relation with an address endpoint for
    /// which `emitted` does not hold.
    fn renderer_endpoints(
        &self,
        emitted: impl Fn(&AddressEndpointKey) -> bool,
    ) -> Vec<RendererEndpoint> {
        let mut by_key = BTreeMap::<AddressEndpointKey, RendererEndpoint>::new();

        for (key, peers) in self.peers.iter().filter(|(key, _)| emitted(key)) {
            let peers = peer_endpoints(peers, &emitted);
            if !peers.is_empty() {
                renderer_endpoint(&mut by_key, key).peer_endpoints = peers;
            }
        }
        for (key, peers) in self.external_peers.iter().filter(|(key, _)| emitted(key)) {
            let peers = peer_endpoints(peers, &emitted);
            if !peers.is_empty() {
                renderer_endpoint(&mut by_key, key).peer_external_endpoints = peers;
            }
        }
        for (key, peers) in self
            .external_containment_peers
            .iter()
            .filter(|(key, _)| emitted(key))
        {
            renderer_endpoint(&mut by_key, key).peer_external_containment_endpoints = peers
                .iter()
                .map(|(peer, groups)| PeerContainmentEndpoint {
                    key: peer.clone(),
                    rule_groups: groups.iter().cloned().collect(),
                })
                .collect();
        }

        by_key.into_values().collect()
    }

    /// Resolves every endpoint referenced by the recorded relations.
    ///
    /// Address endpoints for which no renderer owns a location are omitted. `build_configuration`
    /// drops the relations that name them.
    pub fn build_endpoints(
        &self,
        endpoints: &EndpointInfo,
        locations: &EndpointLocationInfo,
        topology: &RendererTopology,
        augmentors: &AugmentorRegistry,
    ) -> Result<EndpointsWithLocation, BuildError> {
        let mut address_endpoints = Vec::with_capacity(self.address_endpoints.len());
        for key in &self.address_endpoints {
            let endpoint = endpoints
                .address_endpoint(key)
                .ok_or_else(|| BuildError::MissingAddressEndpoint(key.clone()))?;
            let location = locations
                .address_endpoint_location(key)
                .ok_or_else(|| BuildError::MissingAddressEndpointLocation(key.clone()))?;
            let renderer_name = match renderer_name(location, topology) {
                Some(name) => name.clone(),
                None => {
                    tracing::debug!(endpoint = %key, "No renderer owns the endpoint's location");
                    continue;
                }
            };

            let mut augmentations = augmentors.address_endpoint(endpoint);
            if let Some(nat) = endpoint.nat_address.as_ref() {
                augmentations.insert(NAT_ADDRESS.to_string(), nat.clone().into());
            }

            address_endpoints.push(AddressEndpointWithLocation {
                key: key.clone(),
                tenant: endpoint.tenant.clone(),
                endpoint_groups: endpoint.endpoint_groups.clone(),
                conditions: endpoint.conditions.clone(),
                network_containment: endpoint.network_containment.clone(),
                child_endpoints: endpoint.child_endpoints.clone(),
                parent_endpoints: endpoint.parent_endpoints.clone(),
                timestamp: endpoint.timestamp,
                absolute_location: location.absolute_location.clone(),
                relative_locations: location.relative_locations.clone(),
                renderer_name,
                augmentations,
            });
        }

        let mut containment_endpoints = Vec::with_capacity(self.containment_endpoints.len());
        for key in &self.containment_endpoints {
            let endpoint = endpoints
                .containment_endpoint(key)
                .ok_or_else(|| BuildError::MissingContainmentEndpoint(key.clone()))?;
            let location = locations
                .containment_endpoint_location(key)
                .ok_or_else(|| BuildError::MissingContainmentEndpointLocation(key.clone()))?;
            containment_endpoints.push(ContainmentEndpointWithLocation {
                key: key.clone(),
                tenant: endpoint.tenant.clone(),
                endpoint_groups: endpoint.endpoint_groups.clone(),
                conditions: endpoint.conditions.clone(),
                network_containment: endpoint.network_containment.clone(),
                child_endpoints: endpoint.child_endpoints.clone(),
                timestamp: endpoint.timestamp,
                relative_locations: location.relative_locations.clone(),
                augmentations: augmentors.containment_endpoint(endpoint),
            });
        }

        Ok(EndpointsWithLocation {
            address_endpoints,
            containment_endpoints,
        })
    }

    /// Resolves the content of every referenced rule group.
    pub fn build_rule_groups(
        &self,
        policies: &ResolvedPolicyInfo,
    ) -> Result<Vec<PolicyRuleGroup>, BuildError> {
        self.rule_groups
            .iter()
            .map(|key| {
                policies
                    .rule_group(key)
                    .cloned()
                    .ok_or_else(|| BuildError::MissingRuleGroup(key.clone()))
            })
            .collect()
    }

    // TODO only copy the forwarding contexts and network domains that the emitted endpoints
    // are contained in.
    pub fn build_renderer_forwarding(
        &self,
        forwarding: &Forwarding,
        augmentors: &AugmentorRegistry,
    ) -> RendererForwarding {
        let renderer_forwarding_by_tenant = forwarding
            .forwarding_by_tenant
            .iter()
            .map(|tenant| RendererForwardingByTenant {
                tenant_id: tenant.tenant_id.clone(),
                renderer_forwarding_contexts: tenant.forwarding_contexts.clone(),
                renderer_network_domains: tenant
                    .network_domains
                    .iter()
                    .map(|domain| RendererNetworkDomain {
                        network_domain: domain.clone(),
                        augmentations: augmentors.network_domain(domain),
                    })
                    .collect(),
            })
            .collect();
        RendererForwarding {
            renderer_forwarding_by_tenant,
        }
    }

    /// Materializes the renderer's configuration, or `None` when no renderer endpoint has a peer.
    ///
    /// Relations with an address endpoint that no renderer owns are left out, along with the
    /// endpoints and rule groups that only those relations referenced.
    pub fn build_configuration(
        &self,
        endpoints: &EndpointInfo,
        locations: &EndpointLocationInfo,
        policies: &ResolvedPolicyInfo,
        forwarding: &Forwarding,
        topology: &RendererTopology,
        augmentors: &AugmentorRegistry,
    ) -> Result<Option<Configuration>, BuildError> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut endpoints = self.build_endpoints(endpoints, locations, topology, augmentors)?;
        let mut rule_groups = self.build_rule_groups(policies)?;

        let renderer_endpoints = {
            let emitted = endpoints
                .address_endpoints
                .iter()
                .map(|ep| &ep.key)
                .collect::<BTreeSet<_>>();
            self.renderer_endpoints(|key| emitted.contains(key))
        };
        if renderer_endpoints.is_empty() {
            return Ok(None);
        }

        let refs = References::of(&renderer_endpoints);
        endpoints
            .address_endpoints
            .retain(|ep| refs.address_endpoints.contains(&ep.key));
        endpoints
            .containment_endpoints
            .retain(|ep| refs.containment_endpoints.contains(&ep.key));
        rule_groups.retain(|group| refs.rule_groups.contains(&group.key));

        Ok(Some(Configuration {
            renderer_endpoints,
            endpoints,
            rule_groups,
            renderer_forwarding: self.build_renderer_forwarding(forwarding, augmentors),
        }))
    }
}

/// The keys named by a set of renderer endpoint records.
#[derive(Default)]
struct References<'r> {
    address_endpoints: BTreeSet<&'r AddressEndpointKey>,
    containment_endpoints: BTreeSet<&'r ContainmentEndpointKey>,
    rule_groups: BTreeSet<&'r RuleGroupKey>,
}

impl<'r> References<'r> {
    fn of(renderer_endpoints: &'r [RendererEndpoint]) -> Self {
        let mut refs = Self::default();
        for ep in renderer_endpoints {
            refs.address_endpoints.insert(&ep.key);
            for peer in ep.peer_endpoints.iter().chain(&ep.peer_external_endpoints) {
                refs.address_endpoints.insert(&peer.key);
                refs.rule_groups
                    .extend(peer.rule_groups.iter().map(|g| &g.rule_group));
            }
            for peer in &ep.peer_external_containment_endpoints {
                refs.containment_endpoints.insert(&peer.key);
                refs.rule_groups
                    .extend(peer.rule_groups.iter().map(|g| &g.rule_group));
            }
        }
        refs
    }
}

fn peer_endpoints(
    peers: &BTreeMap<AddressEndpointKey, BTreeSet<RuleGroupWithParticipation>>,
    emitted: impl Fn(&AddressEndpointKey) -> bool,
) -> Vec<PeerEndpoint> {
    peers
        .iter()
        .filter(|(peer, _)| emitted(peer))
        .map(|(peer, groups)| PeerEndpoint {
            key: peer.clone(),
            rule_groups: groups.iter().cloned().collect(),
        })
        .collect()
}

fn renderer_endpoint<'m>(
    by_key: &'m mut BTreeMap<AddressEndpointKey, RendererEndpoint>,
    key: &AddressEndpointKey,
) -> &'m mut RendererEndpoint {
    by_key.entry(key.clone()).or_insert_with(|| RendererEndpoint {
        key: key.clone(),
        peer_endpoints: vec![],
        peer_external_endpoints: vec![],
        peer_external_containment_endpoints: vec![],
    })
}

fn with_participation(
    rule_group: &RuleGroupKey,
    participation: Participation,
) -> RuleGroupWithParticipation {
    RuleGroupWithParticipation {
        rule_group: rule_group.clone(),
        renderer_endpoint_participation: participation,
    }
}

/// An endpoint belongs to the renderer owning its absolute node. Endpoints without an absolute
/// location belong to the first renderer owning one of their external mount points.
fn renderer_name<'t>(
    location: &AddressEndpointLocation,
    topology: &'t RendererTopology,
) -> Option<&'t RendererName> {
    if let Some(absolute) = location.absolute_location.as_ref() {
        return topology.renderer(absolute.node());
    }
    location
        .relative_locations
        .as_ref()?
        .external_mount_points()
        .find_map(|node| topology.renderer(node))
}
