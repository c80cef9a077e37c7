use super::*;
use crate::{AugmentorRegistry, BuildError, RendererTopology};
use gbp_policy_controller_core::{
    augment::{Augmentation, EndpointAugmentor, NetworkDomainAugmentor},
    forwarding::{Forwarding, ForwardingByTenant, ForwardingContext, NetworkDomain},
    policy::{ExternalImplicitGroup, Participation},
    renderer::{PeerEndpoint, RendererEndpoint, RuleGroupWithParticipation},
};
use maplit::btreemap;
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Sgt;

impl EndpointAugmentor for Sgt {
    fn address_endpoint_augmentation(&self, endpoint: &AddressEndpoint) -> Option<Augmentation> {
        Some(("sgt".to_string(), endpoint.key.address.clone().into()))
    }
}

struct Subnet;

impl NetworkDomainAugmentor for Subnet {
    fn network_domain_augmentation(&self, domain: &NetworkDomain) -> Option<Augmentation> {
        Some((
            "subnet".to_string(),
            serde_json::json!({ "id": domain.network_domain_id.as_str() }),
        ))
    }
}

fn mk_forwarding() -> Forwarding {
    Forwarding {
        forwarding_by_tenant: vec![ForwardingByTenant {
            tenant_id: TENANT.into(),
            forwarding_contexts: vec![ForwardingContext {
                context_type: "l2-bridge-domain".into(),
                context_id: "l2bd-0".into(),
                name: None,
                parent: None,
            }],
            network_domains: vec![NetworkDomain {
                network_domain_type: "subnet".into(),
                network_domain_id: "subnet-0".into(),
                name: None,
                parent: None,
            }],
        }],
    }
}

/// e1 in web and e2 in db, both on nodes owned by renderer-r. web consumes rg1 from db.
fn web_db() -> TestConfig {
    TestConfig {
        endpoints: Endpoints {
            address_endpoints: vec![mk_endpoint("e1", &["web"]), mk_endpoint("e2", &["db"])],
            containment_endpoints: vec![],
        },
        locations: EndpointLocations {
            address_endpoint_locations: vec![
                mk_internal_location("e1", "node-1"),
                mk_internal_location("e2", "node-2"),
            ],
            containment_endpoint_locations: vec![],
        },
        policies: ResolvedPolicies {
            resolved_policies: vec![mk_policy("web", "db", None, [mk_rule_group("c1", "rg1")])],
        },
        ..Default::default()
    }
}

fn rg1(participation: Participation) -> RuleGroupWithParticipation {
    RuleGroupWithParticipation {
        rule_group: mk_rule_group_key("c1", "rg1"),
        renderer_endpoint_participation: participation,
    }
}

#[test]
fn configuration_for_two_local_endpoints() {
    let test = web_db();
    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1", "node-2"])]);
    let builder = test.resolve([&mk_key("e1"), &mk_key("e2")]);

    let config = builder
        .build_configuration(
            &test.endpoint_info(),
            &test.location_info(),
            &test.policy_info(),
            &mk_forwarding(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect("configuration must build")
        .expect("configuration must not be empty");

    assert_eq!(
        config.renderer_endpoints,
        vec![
            RendererEndpoint {
                key: mk_key("e1"),
                peer_endpoints: vec![PeerEndpoint {
                    key: mk_key("e2"),
                    rule_groups: vec![rg1(Participation::Consumer)],
                }],
                peer_external_endpoints: vec![],
                peer_external_containment_endpoints: vec![],
            },
            RendererEndpoint {
                key: mk_key("e2"),
                peer_endpoints: vec![PeerEndpoint {
                    key: mk_key("e1"),
                    rule_groups: vec![rg1(Participation::Provider)],
                }],
                peer_external_endpoints: vec![],
                peer_external_containment_endpoints: vec![],
            },
        ]
    );

    let emitted = config
        .endpoints
        .address_endpoints
        .iter()
        .map(|ep| (ep.key.clone(), ep.renderer_name.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        emitted,
        vec![
            (mk_key("e1"), "renderer-r".into()),
            (mk_key("e2"), "renderer-r".into()),
        ]
    );
    assert!(config.endpoints.containment_endpoints.is_empty());
    assert_eq!(config.rule_groups, vec![mk_rule_group("c1", "rg1")]);
    assert_eq!(config.renderer_forwarding.renderer_forwarding_by_tenant.len(), 1);
}

#[test]
fn empty_builder_has_no_configuration() {
    let test = web_db();
    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1"])]);
    let config = RendererConfigurationBuilder::default()
        .build_configuration(
            &test.endpoint_info(),
            &test.location_info(),
            &test.policy_info(),
            &Forwarding::default(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect("empty configuration must build");
    assert_eq!(config, None);
}

#[test]
fn adding_a_relation_twice_is_idempotent() {
    let mut once = RendererConfigurationBuilder::default();
    once.add_peer(
        &mk_key("e1"),
        &mk_key("e2"),
        &mk_rule_group_key("c1", "rg1"),
        Participation::Consumer,
    );
    let mut twice = once.clone();
    twice.add_peer(
        &mk_key("e1"),
        &mk_key("e2"),
        &mk_rule_group_key("c1", "rg1"),
        Participation::Consumer,
    );
    assert_eq!(once, twice);
}

#[test]
fn stale_snapshot_fails_the_build() {
    let mut test = web_db();
    let builder = test.resolve([&mk_key("e1")]);
    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1", "node-2"])]);

    // The peer disappears after relations were recorded.
    test.endpoints.address_endpoints.truncate(1);
    let err = builder
        .build_endpoints(
            &test.endpoint_info(),
            &test.location_info(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect_err("missing endpoint must fail the build");
    assert_eq!(err, BuildError::MissingAddressEndpoint(mk_key("e2")));

    let test = web_db();
    let mut locations = test.locations.clone();
    locations.address_endpoint_locations.truncate(1);
    let err = builder
        .build_endpoints(
            &test.endpoint_info(),
            &EndpointLocationInfo::new(&locations),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect_err("missing location must fail the build");
    assert_eq!(err, BuildError::MissingAddressEndpointLocation(mk_key("e2")));

    let err = builder
        .build_rule_groups(&ResolvedPolicyInfo::default())
        .expect_err("missing rule group must fail the build");
    assert_eq!(err, BuildError::MissingRuleGroup(mk_rule_group_key("c1", "rg1")));
}

#[test]
fn stale_containment_endpoint_fails_the_build() {
    let mut builder = RendererConfigurationBuilder::default();
    builder.add_peer_external_containment(
        &mk_key("e1"),
        &mk_containment_key("l3-0"),
        &mk_rule_group_key("c1", "rg1"),
        Participation::Consumer,
    );
    let test = web_db();
    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1"])]);
    let err = builder
        .build_endpoints(
            &test.endpoint_info(),
            &test.location_info(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect_err("missing containment endpoint must fail the build");
    assert_eq!(
        err,
        BuildError::MissingContainmentEndpoint(mk_containment_key("l3-0"))
    );
}

#[test]
fn renderer_name_from_external_mount_point() {
    let mut test = web_db();
    test.policies.resolved_policies[0].external_implicit_group =
        Some(ExternalImplicitGroup::ProviderEpg);
    test.locations.address_endpoint_locations[1] = mk_relative_location("e2", "gw-1");
    let builder = test.resolve([&mk_key("e1")]);

    let topology = RendererTopology::new(&[
        mk_renderer("renderer-r", &["node-1"]),
        mk_renderer("renderer-gw", &["gw-1"]),
    ]);
    let endpoints = builder
        .build_endpoints(
            &test.endpoint_info(),
            &test.location_info(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect("endpoints must build");
    let names = endpoints
        .address_endpoints
        .iter()
        .map(|ep| (ep.key.clone(), ep.renderer_name.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            (mk_key("e1"), "renderer-r".into()),
            (mk_key("e2"), "renderer-gw".into()),
        ]
    );

    // Without an owner for the mount point, the external endpoint is not emitted.
    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1"])]);
    let endpoints = builder
        .build_endpoints(
            &test.endpoint_info(),
            &test.location_info(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect("endpoints must build");
    assert_eq!(endpoints.address_endpoints.len(), 1);
    assert_eq!(endpoints.address_endpoints[0].key, mk_key("e1"));
}

#[test]
fn unowned_external_peer_leaves_no_configuration() {
    let mut test = web_db();
    test.policies.resolved_policies[0].external_implicit_group =
        Some(ExternalImplicitGroup::ProviderEpg);
    test.locations.address_endpoint_locations[1] = mk_relative_location("e2", "gw-1");
    let builder = test.resolve([&mk_key("e1")]);
    assert_eq!(builder.build_renderer_endpoints().len(), 1);

    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1"])]);
    let config = builder
        .build_configuration(
            &test.endpoint_info(),
            &test.location_info(),
            &test.policy_info(),
            &mk_forwarding(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect("configuration must build");
    assert_eq!(config, None);
}

#[test]
fn relations_with_unowned_endpoints_are_dropped() {
    // e3 in app sits on a node that no renderer owns. web also consumes rg2 from app.
    let mut test = web_db();
    test.endpoints
        .address_endpoints
        .push(mk_endpoint("e3", &["app"]));
    test.locations
        .address_endpoint_locations
        .push(mk_internal_location("e3", "node-9"));
    test.policies
        .resolved_policies
        .push(mk_policy("web", "app", None, [mk_rule_group("c2", "rg2")]));
    let builder = test.resolve([&mk_key("e1"), &mk_key("e3")]);

    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1", "node-2"])]);
    let config = builder
        .build_configuration(
            &test.endpoint_info(),
            &test.location_info(),
            &test.policy_info(),
            &mk_forwarding(),
            &topology,
            &AugmentorRegistry::default(),
        )
        .expect("configuration must build")
        .expect("configuration must not be empty");

    assert_eq!(
        config.renderer_endpoints,
        vec![RendererEndpoint {
            key: mk_key("e1"),
            peer_endpoints: vec![PeerEndpoint {
                key: mk_key("e2"),
                rule_groups: vec![rg1(Participation::Consumer)],
            }],
            peer_external_endpoints: vec![],
            peer_external_containment_endpoints: vec![],
        }]
    );

    let emitted = config
        .endpoints
        .address_endpoints
        .iter()
        .map(|ep| ep.key.clone())
        .collect::<Vec<_>>();
    assert_eq!(emitted, vec![mk_key("e1"), mk_key("e2")]);
    for ep in &config.renderer_endpoints {
        assert!(emitted.contains(&ep.key), "{} is not emitted", ep.key);
        for peer in ep.peer_endpoints.iter().chain(&ep.peer_external_endpoints) {
            assert!(emitted.contains(&peer.key), "{} is not emitted", peer.key);
        }
    }
    assert_eq!(config.rule_groups, vec![mk_rule_group("c1", "rg1")]);
}

#[test]
fn augmentations() {
    let mut test = web_db();
    test.endpoints.address_endpoints[1].nat_address = Some("198.51.100.7".to_string());
    let builder = test.resolve([&mk_key("e1")]);
    let topology = RendererTopology::new(&[mk_renderer("renderer-r", &["node-1", "node-2"])]);

    let mut augmentors = AugmentorRegistry::default();
    augmentors.register_endpoint_augmentor(Arc::new(Sgt));
    augmentors.register_network_domain_augmentor(Arc::new(Subnet));

    let config = builder
        .build_configuration(
            &test.endpoint_info(),
            &test.location_info(),
            &test.policy_info(),
            &mk_forwarding(),
            &topology,
            &augmentors,
        )
        .expect("configuration must build")
        .expect("configuration must not be empty");

    let augmentations = config
        .endpoints
        .address_endpoints
        .iter()
        .map(|ep| ep.augmentations.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        augmentations,
        vec![
            btreemap! { "sgt".to_string() => "e1".into() },
            btreemap! {
                "nat-address".to_string() => "198.51.100.7".into(),
                "sgt".to_string() => "e2".into(),
            },
        ]
    );

    let domains = &config.renderer_forwarding.renderer_forwarding_by_tenant[0]
        .renderer_network_domains;
    assert_eq!(domains.len(), 1);
    assert_eq!(
        domains[0].augmentations,
        btreemap! { "subnet".to_string() => serde_json::json!({ "id": "subnet-0" }) }
    );
}
