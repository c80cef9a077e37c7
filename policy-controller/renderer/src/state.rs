use gbp_policy_controller_core::{forwarding::Forwarding, renderer::Configuration, RendererName};
use gbp_policy_controller_index::{
    AugmentorRegistry, BuildError, EndpointInfo, EndpointLocationInfo, PolicyResolution,
    RendererConfigurationBuilder, RendererTopology, ResolvedPolicyInfo,
};
use std::{collections::BTreeMap, sync::Arc};

/// A snapshot of every input feed.
///
/// Snapshots compare by value, so an update that republishes identical content leaves the
/// snapshot unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputState {
    pub endpoints: Option<Arc<EndpointInfo>>,
    pub locations: Option<Arc<EndpointLocationInfo>>,
    pub policies: Option<Arc<ResolvedPolicyInfo>>,
    pub forwarding: Option<Arc<Forwarding>>,
    pub topology: Arc<RendererTopology>,
}

/// A snapshot in which every feed has been received.
struct Complete<'s> {
    endpoints: &'s EndpointInfo,
    locations: &'s EndpointLocationInfo,
    policies: &'s ResolvedPolicyInfo,
    forwarding: &'s Forwarding,
    topology: &'s RendererTopology,
}

// === impl InputState ===

impl InputState {
    /// Indicates whether configurations may be computed from this snapshot.
    pub fn is_valid(&self) -> bool {
        self.complete().is_some()
    }

    fn complete(&self) -> Option<Complete<'_>> {
        if self.topology.is_empty() {
            return None;
        }
        Some(Complete {
            endpoints: self.endpoints.as_deref()?,
            locations: self.locations.as_deref()?,
            policies: self.policies.as_deref()?,
            forwarding: self.forwarding.as_deref()?,
            topology: &self.topology,
        })
    }

    /// Computes the configuration of every renderer in the topology.
    ///
    /// Renderers that own no endpoint with a peer have no configuration. When the snapshot is not
    /// valid, no renderer has a configuration.
    pub fn configurations(
        &self,
        augmentors: &AugmentorRegistry,
    ) -> BTreeMap<RendererName, Result<Option<Configuration>, BuildError>> {
        let complete = self.complete();
        let builders = complete.as_ref().map(Complete::builders).unwrap_or_default();

        self.topology
            .renderer_names()
            .into_iter()
            .map(|name| {
                let config = match (complete.as_ref(), builders.get(&name)) {
                    (Some(s), Some(builder)) => builder.build_configuration(
                        s.endpoints,
                        s.locations,
                        s.policies,
                        s.forwarding,
                        s.topology,
                        augmentors,
                    ),
                    _ => Ok(None),
                };
                (name, config)
            })
            .collect()
    }
}

// === impl Complete ===

impl Complete<'_> {
    /// Resolves every endpoint whose absolute node is owned by a renderer into that renderer's
    /// builder.
    fn builders(&self) -> BTreeMap<RendererName, RendererConfigurationBuilder> {
        let resolution = PolicyResolution::new(self.endpoints, self.locations, self.policies);
        let mut builders = BTreeMap::<RendererName, RendererConfigurationBuilder>::new();
        for node in self.locations.absolute_nodes() {
            let renderer = match self.topology.renderer(node) {
                Some(renderer) => renderer,
                None => {
                    tracing::trace!(%node, "No renderer owns node");
                    continue;
                }
            };
            let builder = builders.entry(renderer.clone()).or_default();
            for key in self.locations.address_endpoints_at_node(node) {
                match self.endpoints.address_endpoint(key) {
                    Some(endpoint) => resolution.resolve_endpoint(endpoint, builder),
                    None => tracing::trace!(endpoint = %key, "Located endpoint does not exist"),
                }
            }
        }
        builders
    }
}
