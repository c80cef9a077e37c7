use crate::{
    AddressType, ConditionName, ContextId, ContextType, EndpointGroupId, EpgKey, NetworkDomainId,
    NetworkDomainType, TenantId,
};
use chrono::{offset::Utc, DateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an endpoint by its address within a context (e.g. a MAC address in an L2
/// bridge domain).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressEndpointKey {
    pub address: String,
    pub address_type: AddressType,
    pub context_id: ContextId,
    pub context_type: ContextType,
}

/// Identifies an endpoint that stands for a whole context rather than a single address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainmentEndpointKey {
    pub context_id: ContextId,
    pub context_type: ContextType,
}

/// The network an endpoint is contained in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkContainment {
    ForwardingContext {
        context_type: ContextType,
        context_id: ContextId,
    },
    NetworkDomain {
        network_domain_type: NetworkDomainType,
        network_domain_id: NetworkDomainId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParentEndpoint {
    Address(AddressEndpointKey),
    Containment(ContainmentEndpointKey),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressEndpoint {
    #[serde(flatten)]
    pub key: AddressEndpointKey,
    pub tenant: TenantId,
    #[serde(default)]
    pub endpoint_groups: Vec<EndpointGroupId>,
    #[serde(default)]
    pub conditions: Vec<ConditionName>,
    #[serde(default)]
    pub network_containment: Option<NetworkContainment>,
    #[serde(default)]
    pub child_endpoints: Vec<AddressEndpointKey>,
    #[serde(default)]
    pub parent_endpoints: Vec<ParentEndpoint>,
    /// Set when the endpoint is reachable through a NAT translation.
    #[serde(default)]
    pub nat_address: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainmentEndpoint {
    #[serde(flatten)]
    pub key: ContainmentEndpointKey,
    pub tenant: TenantId,
    #[serde(default)]
    pub endpoint_groups: Vec<EndpointGroupId>,
    #[serde(default)]
    pub conditions: Vec<ConditionName>,
    #[serde(default)]
    pub network_containment: Option<NetworkContainment>,
    #[serde(default)]
    pub child_endpoints: Vec<AddressEndpointKey>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The endpoints collection, as published by the endpoint registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Endpoints {
    #[serde(default)]
    pub address_endpoints: Vec<AddressEndpoint>,
    #[serde(default)]
    pub containment_endpoints: Vec<ContainmentEndpoint>,
}

// === impl AddressEndpointKey ===

impl AddressEndpointKey {
    pub fn new(
        address: impl ToString,
        address_type: impl Into<AddressType>,
        context_id: impl Into<ContextId>,
        context_type: impl Into<ContextType>,
    ) -> Self {
        Self {
            address: address.to_string(),
            address_type: address_type.into(),
            context_id: context_id.into(),
            context_type: context_type.into(),
        }
    }
}

impl fmt::Display for AddressEndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}:{}",
            self.address_type, self.address, self.context_type, self.context_id
        )
    }
}

// === impl ContainmentEndpointKey ===

impl ContainmentEndpointKey {
    pub fn new(context_id: impl Into<ContextId>, context_type: impl Into<ContextType>) -> Self {
        Self {
            context_id: context_id.into(),
            context_type: context_type.into(),
        }
    }
}

impl fmt::Display for ContainmentEndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.context_type, self.context_id)
    }
}

// === impl AddressEndpoint ===

impl AddressEndpoint {
    /// Returns the endpoint groups this endpoint is a member of, scoped to its tenant.
    pub fn epg_keys(&self) -> impl Iterator<Item = EpgKey> + '_ {
        epg_keys(&self.tenant, &self.endpoint_groups)
    }
}

// === impl ContainmentEndpoint ===

impl ContainmentEndpoint {
    pub fn epg_keys(&self) -> impl Iterator<Item = EpgKey> + '_ {
        epg_keys(&self.tenant, &self.endpoint_groups)
    }
}

fn epg_keys<'a>(
    tenant: &'a TenantId,
    groups: &'a [EndpointGroupId],
) -> impl Iterator<Item = EpgKey> + 'a {
    groups.iter().map(move |id| EpgKey {
        epg_id: id.clone(),
        tenant_id: tenant.clone(),
    })
}
