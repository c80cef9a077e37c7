use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl ToString) -> Self {
                Self(value.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id!(TenantId);
id!(
    /// Identifies an endpoint group within a tenant.
    EndpointGroupId
);
id!(ContextId);
id!(ContextType);
id!(AddressType);
id!(ConditionName);
id!(ContractId);
id!(SubjectName);
id!(RuleName);
id!(ClassifierName);
id!(ClassifierDefinitionId);
id!(ActionName);
id!(ActionDefinitionId);
id!(NetworkDomainId);
id!(NetworkDomainType);
id!(NodeConnectorId);
id!(
    /// Names a renderer instance, e.g. a device agent responsible for a set of nodes.
    RendererName
);
id!(
    /// The path of an infrastructure node (or of an external node's mount point).
    NodeId
);

/// Identifies an endpoint group: the unit of policy grouping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EpgKey {
    pub epg_id: EndpointGroupId,
    pub tenant_id: TenantId,
}

// === impl EpgKey ===

impl EpgKey {
    pub fn new(epg_id: impl Into<EndpointGroupId>, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            epg_id: epg_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

impl fmt::Display for EpgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.epg_id)
    }
}
