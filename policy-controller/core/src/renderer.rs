//! The renderer collection and the configuration computed for each renderer.

use crate::{
    endpoint::{
        AddressEndpointKey, ContainmentEndpointKey, NetworkContainment, ParentEndpoint,
    },
    forwarding::{ForwardingContext, NetworkDomain},
    location::{AbsoluteLocation, RelativeLocations},
    policy::{Participation, PolicyRuleGroup, RuleGroupKey},
    ConditionName, EndpointGroupId, NodeId, RendererName, TenantId,
};
use chrono::{offset::Utc, DateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A policy version. Versions are assigned by the renderer manager and are only meaningful for
/// the lifetime of its process.
pub type Version = u64;

/// Renderer-specific extra fields attached to emitted records, keyed by augmentation name.
pub type Augmentations = BTreeMap<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Renderer {
    pub name: RendererName,
    /// The infrastructure nodes this renderer is responsible for.
    #[serde(default)]
    pub renderer_nodes: Vec<NodeId>,
    #[serde(default)]
    pub renderer_policy: Option<RendererPolicy>,
}

/// The renderer collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Renderers {
    #[serde(default)]
    pub renderers: Vec<Renderer>,
}

/// A renderer's policy.
///
/// When written by the renderer manager it carries the version and, when there is anything
/// to configure, the configuration. When written by a renderer it acknowledges the version it
/// has applied along with the status of that attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererPolicy {
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub configuration: Option<Configuration>,
    #[serde(default)]
    pub status: Option<Status>,
}

/// Reports what a renderer failed to apply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Status {
    #[serde(default)]
    pub unconfigured_endpoints: Vec<UnconfiguredEndpoint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnconfiguredEndpoint {
    #[serde(flatten)]
    pub key: AddressEndpointKey,
    #[serde(default)]
    pub info: Option<String>,
}

/// Everything a renderer must install.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    pub renderer_endpoints: Vec<RendererEndpoint>,
    pub endpoints: EndpointsWithLocation,
    pub rule_groups: Vec<PolicyRuleGroup>,
    pub renderer_forwarding: RendererForwarding,
}

/// An endpoint located on one of the renderer's nodes, with all of its peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererEndpoint {
    #[serde(flatten)]
    pub key: AddressEndpointKey,
    #[serde(default)]
    pub peer_endpoints: Vec<PeerEndpoint>,
    #[serde(default)]
    pub peer_external_endpoints: Vec<PeerEndpoint>,
    #[serde(default)]
    pub peer_external_containment_endpoints: Vec<PeerContainmentEndpoint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeerEndpoint {
    #[serde(flatten)]
    pub key: AddressEndpointKey,
    pub rule_groups: Vec<RuleGroupWithParticipation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeerContainmentEndpoint {
    #[serde(flatten)]
    pub key: ContainmentEndpointKey,
    pub rule_groups: Vec<RuleGroupWithParticipation>,
}

/// A rule group governing a relation, with the role the renderer endpoint plays in it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleGroupWithParticipation {
    #[serde(flatten)]
    pub rule_group: RuleGroupKey,
    pub renderer_endpoint_participation: Participation,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointsWithLocation {
    pub address_endpoints: Vec<AddressEndpointWithLocation>,
    pub containment_endpoints: Vec<ContainmentEndpointWithLocation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressEndpointWithLocation {
    #[serde(flatten)]
    pub key: AddressEndpointKey,
    pub tenant: TenantId,
    pub endpoint_groups: Vec<EndpointGroupId>,
    pub conditions: Vec<ConditionName>,
    pub network_containment: Option<NetworkContainment>,
    pub child_endpoints: Vec<AddressEndpointKey>,
    pub parent_endpoints: Vec<ParentEndpoint>,
    pub timestamp: Option<DateTime<Utc>>,
    pub absolute_location: Option<AbsoluteLocation>,
    pub relative_locations: Option<RelativeLocations>,
    /// The renderer that owns the endpoint's location.
    pub renderer_name: RendererName,
    #[serde(default)]
    pub augmentations: Augmentations,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainmentEndpointWithLocation {
    #[serde(flatten)]
    pub key: ContainmentEndpointKey,
    pub tenant: TenantId,
    pub endpoint_groups: Vec<EndpointGroupId>,
    pub conditions: Vec<ConditionName>,
    pub network_containment: Option<NetworkContainment>,
    pub child_endpoints: Vec<AddressEndpointKey>,
    pub timestamp: Option<DateTime<Utc>>,
    pub relative_locations: Option<RelativeLocations>,
    #[serde(default)]
    pub augmentations: Augmentations,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererForwarding {
    pub renderer_forwarding_by_tenant: Vec<RendererForwardingByTenant>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererForwardingByTenant {
    pub tenant_id: TenantId,
    pub renderer_forwarding_contexts: Vec<ForwardingContext>,
    pub renderer_network_domains: Vec<RendererNetworkDomain>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererNetworkDomain {
    #[serde(flatten)]
    pub network_domain: NetworkDomain,
    #[serde(default)]
    pub augmentations: Augmentations,
}

// === impl RendererPolicy ===

impl RendererPolicy {
    /// Indicates whether the renderer reported endpoints it could not configure.
    pub fn has_unconfigured_endpoints(&self) -> bool {
        self.status
            .as_ref()
            .map_or(false, |s| !s.unconfigured_endpoints.is_empty())
    }
}

// === impl RendererEndpoint ===

impl RendererEndpoint {
    pub fn is_empty(&self) -> bool {
        self.peer_endpoints.is_empty()
            && self.peer_external_endpoints.is_empty()
            && self.peer_external_containment_endpoints.is_empty()
    }
}
