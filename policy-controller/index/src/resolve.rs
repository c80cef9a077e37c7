use crate::{EndpointInfo, EndpointLocationInfo, RendererConfigurationBuilder, ResolvedPolicyInfo};
use gbp_policy_controller_core::{
    endpoint::{AddressEndpoint, AddressEndpointKey, ContainmentEndpointKey},
    policy::{Participation, ResolvedPolicy},
    EpgKey, EXTERNAL_EPG_ID,
};

/// Discovers the peer relations of renderer-owned endpoints.
///
/// Resolution is a pure function of the three indices: the relations recorded for an endpoint do
/// not depend on the order in which endpoints, groups or peers are visited.
#[derive(Copy, Clone, Debug)]
pub struct PolicyResolution<'a> {
    endpoints: &'a EndpointInfo,
    locations: &'a EndpointLocationInfo,
    policies: &'a ResolvedPolicyInfo,
}

// === impl PolicyResolution ===

impl<'a> PolicyResolution<'a> {
    pub fn new(
        endpoints: &'a EndpointInfo,
        locations: &'a EndpointLocationInfo,
        policies: &'a ResolvedPolicyInfo,
    ) -> Self {
        Self {
            endpoints,
            locations,
            policies,
        }
    }

    /// Records every relation governing `endpoint` into `builder`.
    ///
    /// # Panics
    ///
    /// If the policy index reports a peer group for which it holds no policy.
    pub fn resolve_endpoint(
        &self,
        endpoint: &AddressEndpoint,
        builder: &mut RendererConfigurationBuilder,
    ) {
        if endpoint.endpoint_groups.is_empty() {
            tracing::trace!(endpoint = %endpoint.key, "Endpoint is not a member of any group");
            return;
        }
        if endpoint
            .endpoint_groups
            .iter()
            .any(|epg| epg.as_str() == EXTERNAL_EPG_ID)
        {
            tracing::debug!(endpoint = %endpoint.key, "Skipping endpoint in the external group");
            return;
        }

        for epg in endpoint.epg_keys() {
            for consumer in self.policies.consumer_peers(&epg) {
                let policy = self.expect_policy(consumer, &epg);
                self.resolve_peers(
                    &endpoint.key,
                    consumer,
                    policy,
                    Participation::Provider,
                    builder,
                );
            }
            for provider in self.policies.provider_peers(&epg) {
                let policy = self.expect_policy(&epg, provider);
                self.resolve_peers(
                    &endpoint.key,
                    provider,
                    policy,
                    Participation::Consumer,
                    builder,
                );
            }
        }
    }

    pub(crate) fn expect_policy(&self, consumer: &EpgKey, provider: &EpgKey) -> &'a ResolvedPolicy {
        match self.policies.policy(consumer, provider) {
            Some(policy) => policy,
            None => {
                panic!("no resolved policy between consumer {consumer} and provider {provider}")
            }
        }
    }

    fn resolve_peers(
        &self,
        endpoint: &AddressEndpointKey,
        peer_epg: &EpgKey,
        policy: &ResolvedPolicy,
        participation: Participation,
        builder: &mut RendererConfigurationBuilder,
    ) {
        let eig = policy.external_implicit_group;
        if participation.is_external_in(eig) {
            tracing::debug!(
                %endpoint,
                %participation,
                consumer = %policy.consumer,
                provider = %policy.provider,
                "Endpoint is in the external implicit group of the relation"
            );
            return;
        }

        for peer in self.endpoints.address_endpoints_with_epg(peer_epg) {
            if peer == endpoint {
                continue;
            }
            if eig.is_some() {
                if !self.locations.has_relative_location(peer) {
                    tracing::debug!(%peer, "External peer has no relative location");
                    continue;
                }
                for group in &policy.rule_groups {
                    builder.add_peer_external(endpoint, peer, &group.key, participation);
                }
            } else {
                if !self.locations.has_location(peer) {
                    tracing::debug!(%peer, "Peer has no location");
                    continue;
                }
                for group in &policy.rule_groups {
                    builder.add_peer(endpoint, peer, &group.key, participation);
                }
            }
        }

        for peer in self.endpoints.containment_endpoints_with_epg(peer_epg) {
            self.resolve_containment_peer(endpoint, peer, policy, participation, builder);
        }
    }

    fn resolve_containment_peer(
        &self,
        endpoint: &AddressEndpointKey,
        peer: &ContainmentEndpointKey,
        policy: &ResolvedPolicy,
        participation: Participation,
        builder: &mut RendererConfigurationBuilder,
    ) {
        if policy.external_implicit_group.is_none() {
            tracing::debug!(%peer, "Containment peer is only valid in an external implicit group");
            return;
        }
        if !self.locations.containment_has_relative_location(peer) {
            tracing::debug!(%peer, "External containment peer has no relative location");
            return;
        }
        for group in &policy.rule_groups {
            builder.add_peer_external_containment(endpoint, peer, &group.key, participation);
        }
    }
}
