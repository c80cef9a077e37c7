use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use gbp_policy_controller_core::{
    endpoint::{
        AddressEndpoint, AddressEndpointKey, ContainmentEndpoint, ContainmentEndpointKey,
        Endpoints,
    },
    EpgKey,
};

/// Indexes endpoints by key and by endpoint group membership.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointInfo {
    address_by_key: HashMap<AddressEndpointKey, AddressEndpoint>,
    containment_by_key: HashMap<ContainmentEndpointKey, ContainmentEndpoint>,
    address_by_epg: HashMap<EpgKey, HashSet<AddressEndpointKey>>,
    containment_by_epg: HashMap<EpgKey, HashSet<ContainmentEndpointKey>>,
}

// === impl EndpointInfo ===

impl EndpointInfo {
    pub fn new(endpoints: &Endpoints) -> Self {
        // Later records replace earlier ones with the same key, so group memberships are only
        // indexed once each key has been resolved to its final record.
        let address_by_key = endpoints
            .address_endpoints
            .iter()
            .map(|ep| (ep.key.clone(), ep.clone()))
            .collect::<HashMap<_, _>>();
        let containment_by_key = endpoints
            .containment_endpoints
            .iter()
            .map(|ep| (ep.key.clone(), ep.clone()))
            .collect::<HashMap<_, _>>();

        let mut address_by_epg = HashMap::<EpgKey, HashSet<AddressEndpointKey>>::default();
        for ep in address_by_key.values() {
            for epg in ep.epg_keys() {
                address_by_epg
                    .entry(epg)
                    .or_default()
                    .insert(ep.key.clone());
            }
        }

        let mut containment_by_epg = HashMap::<EpgKey, HashSet<ContainmentEndpointKey>>::default();
        for ep in containment_by_key.values() {
            for epg in ep.epg_keys() {
                containment_by_epg
                    .entry(epg)
                    .or_default()
                    .insert(ep.key.clone());
            }
        }

        Self {
            address_by_key,
            containment_by_key,
            address_by_epg,
            containment_by_epg,
        }
    }

    pub fn address_endpoint(&self, key: &AddressEndpointKey) -> Option<&AddressEndpoint> {
        self.address_by_key.get(key)
    }

    pub fn containment_endpoint(
        &self,
        key: &ContainmentEndpointKey,
    ) -> Option<&ContainmentEndpoint> {
        self.containment_by_key.get(key)
    }

    pub fn address_endpoints_with_epg<'a>(
        &'a self,
        epg: &EpgKey,
    ) -> impl Iterator<Item = &'a AddressEndpointKey> + 'a {
        self.address_by_epg.get(epg).into_iter().flatten()
    }

    pub fn containment_endpoints_with_epg<'a>(
        &'a self,
        epg: &EpgKey,
    ) -> impl Iterator<Item = &'a ContainmentEndpointKey> + 'a {
        self.containment_by_epg.get(epg).into_iter().flatten()
    }

    pub fn address_endpoints_len(&self) -> usize {
        self.address_by_key.len()
    }

    pub fn containment_endpoints_len(&self) -> usize {
        self.containment_by_key.len()
    }
}
