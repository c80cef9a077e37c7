use gbp_policy_controller_core::{
    augment::{EndpointAugmentor, NetworkDomainAugmentor},
    endpoint::{AddressEndpoint, ContainmentEndpoint},
    forwarding::NetworkDomain,
    renderer::Augmentations,
};
use std::{fmt, sync::Arc};

/// Renderer-specific augmentors consulted while building configurations.
#[derive(Clone, Default)]
pub struct AugmentorRegistry {
    endpoint: Vec<Arc<dyn EndpointAugmentor>>,
    network_domain: Vec<Arc<dyn NetworkDomainAugmentor>>,
}

// === impl AugmentorRegistry ===

impl AugmentorRegistry {
    pub fn register_endpoint_augmentor(&mut self, augmentor: Arc<dyn EndpointAugmentor>) {
        self.endpoint.push(augmentor);
    }

    pub fn register_network_domain_augmentor(
        &mut self,
        augmentor: Arc<dyn NetworkDomainAugmentor>,
    ) {
        self.network_domain.push(augmentor);
    }

    pub(crate) fn address_endpoint(&self, endpoint: &AddressEndpoint) -> Augmentations {
        self.endpoint
            .iter()
            .filter_map(|a| a.address_endpoint_augmentation(endpoint))
            .collect()
    }

    pub(crate) fn containment_endpoint(&self, endpoint: &ContainmentEndpoint) -> Augmentations {
        self.endpoint
            .iter()
            .filter_map(|a| a.containment_endpoint_augmentation(endpoint))
            .collect()
    }

    pub(crate) fn network_domain(&self, domain: &NetworkDomain) -> Augmentations {
        self.network_domain
            .iter()
            .filter_map(|a| a.network_domain_augmentation(domain))
            .collect()
    }
}

impl fmt::Debug for AugmentorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AugmentorRegistry")
            .field("endpoint", &self.endpoint.len())
            .field("network_domain", &self.network_domain.len())
            .finish()
    }
}
