use crate::{ContextId, ContextType, NetworkDomainId, NetworkDomainType, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Parent {
    pub context_type: ContextType,
    pub context_id: ContextId,
}

/// An L2/L3 forwarding context (e.g. a bridge domain or a VRF).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ForwardingContext {
    pub context_type: ContextType,
    pub context_id: ContextId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<Parent>,
}

/// A network domain (e.g. a subnet) attached to a forwarding context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkDomain {
    pub network_domain_type: NetworkDomainType,
    pub network_domain_id: NetworkDomainId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<Parent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ForwardingByTenant {
    pub tenant_id: TenantId,
    #[serde(default)]
    pub forwarding_contexts: Vec<ForwardingContext>,
    #[serde(default)]
    pub network_domains: Vec<NetworkDomain>,
}

/// The forwarding collection: each tenant's forwarding-context/network-domain graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Forwarding {
    #[serde(default)]
    pub forwarding_by_tenant: Vec<ForwardingByTenant>,
}
