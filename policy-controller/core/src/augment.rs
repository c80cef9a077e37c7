//! Extension points that let renderer-specific modules attach extra fields to emitted records.
//!
//! The controller calls augmentors while building a configuration but never interprets what
//! they return.

use crate::{
    endpoint::{AddressEndpoint, ContainmentEndpoint},
    forwarding::NetworkDomain,
};

/// A named augmentation.
pub type Augmentation = (String, serde_json::Value);

pub trait EndpointAugmentor: Send + Sync {
    fn address_endpoint_augmentation(&self, _endpoint: &AddressEndpoint) -> Option<Augmentation> {
        None
    }

    fn containment_endpoint_augmentation(
        &self,
        _endpoint: &ContainmentEndpoint,
    ) -> Option<Augmentation> {
        None
    }
}

pub trait NetworkDomainAugmentor: Send + Sync {
    fn network_domain_augmentation(&self, domain: &NetworkDomain) -> Option<Augmentation>;
}
