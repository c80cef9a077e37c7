
use crate::{ControllerMetrics, Dispatch, Event, RendererAck, RendererManager};
use gbp_policy_controller_core::{
    endpoint::{AddressEndpoint, AddressEndpointKey, Endpoints},
    forwarding::Forwarding,
    location::{AbsoluteLocation, AddressEndpointLocation, EndpointLocations},
    policy::{PolicyRuleGroup, ResolvedPolicies, ResolvedPolicy, RuleGroupKey},
    renderer::{Configuration, Renderer, RendererPolicy, Renderers, Status, Version},
    EndpointGroupId, EpgKey,
};
use gbp_policy_controller_index::AugmentorRegistry;

const TENANT: &str = "tenant-0";
const RENDERER: &str = "renderer-r";

fn init_tracing() -> tracing::subscriber::DefaultGuard {
    tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .finish(),
    )
}

fn mk_manager() -> RendererManager {
    RendererManager::new(AugmentorRegistry::default(), ControllerMetrics::default())
}

fn mk_key(address: &str) -> AddressEndpointKey {
    AddressEndpointKey::new(address, "mac-address", "l2bd-0", "l2-bridge-domain")
}

fn mk_endpoint(address: &str, epgs: &[&str]) -> AddressEndpoint {
    AddressEndpoint {
        key: mk_key(address),
        tenant: TENANT.into(),
        endpoint_groups: epgs.iter().copied().map(EndpointGroupId::from).collect(),
        conditions: vec![],
        network_containment: None,
        child_endpoints: vec![],
        parent_endpoints: vec![],
        nat_address: None,
        timestamp: None,
    }
}

fn mk_endpoints(endpoints: impl IntoIterator<Item = AddressEndpoint>) -> Event {
    Event::EndpointsUpdated(Endpoints {
        address_endpoints: endpoints.into_iter().collect(),
        containment_endpoints: vec![],
    })
}

fn mk_locations(locations: &[(&str, &str)]) -> Event {
    Event::LocationsUpdated(EndpointLocations {
        address_endpoint_locations: locations
            .iter()
            .map(|(address, node)| AddressEndpointLocation {
                key: mk_key(address),
                absolute_location: Some(AbsoluteLocation::internal(*node)),
                relative_locations: None,
            })
            .collect(),
        containment_endpoint_locations: vec![],
    })
}

fn mk_rule_group_key(subject: &str) -> RuleGroupKey {
    RuleGroupKey::new(TENANT, "contract-0", subject)
}

fn mk_policies(policies: &[(&str, &str, &str)]) -> Event {
    Event::PoliciesUpdated(ResolvedPolicies {
        resolved_policies: policies
            .iter()
            .map(|(consumer, provider, subject)| ResolvedPolicy {
                consumer: EpgKey::new(*consumer, TENANT),
                provider: EpgKey::new(*provider, TENANT),
                external_implicit_group: None,
                rule_groups: vec![PolicyRuleGroup {
                    key: mk_rule_group_key(subject),
                    order: None,
                    resolved_rules: vec![],
                }],
            })
            .collect(),
    })
}

fn mk_topology(renderers: &[(&str, &[&str])]) -> Event {
    Event::TopologyUpdated(Renderers {
        renderers: renderers
            .iter()
            .map(|(name, nodes)| Renderer {
                name: (*name).into(),
                renderer_nodes: nodes.iter().copied().map(Into::into).collect(),
                renderer_policy: None,
            })
            .collect(),
    })
}

fn mk_ack(renderer: &str, version: Version) -> Event {
    Event::RendererAcked(RendererAck {
        name: renderer.into(),
        version,
        status: None,
    })
}

fn mk_partial_ack(renderer: &str, version: Version, status: Status) -> Event {
    Event::RendererAcked(RendererAck {
        name: renderer.into(),
        version,
        status: Some(status),
    })
}

/// e1 in web and e2 in db, on nodes owned by a single renderer. web consumes rg1 from db.
fn web_db_events() -> Vec<Event> {
    vec![
        mk_endpoints([mk_endpoint("e1", &["web"]), mk_endpoint("e2", &["db"])]),
        mk_locations(&[("e1", "node-1"), ("e2", "node-2")]),
        mk_policies(&[("web", "db", "rg1")]),
        Event::ForwardingUpdated(Forwarding::default()),
        mk_topology(&[(RENDERER, &["node-1", "node-2"])]),
    ]
}

/// Applies each event, asserting that only the last one produces a dispatch.
fn handle_all(manager: &mut RendererManager, events: Vec<Event>) -> Option<Dispatch> {
    let mut dispatch = None;
    for event in events {
        assert_eq!(dispatch, None, "only the last event may dispatch");
        dispatch = manager.handle(event);
    }
    dispatch
}

fn renderer_policy<'d>(dispatch: &'d Dispatch, renderer: &str) -> &'d RendererPolicy {
    dispatch
        .renderers
        .renderers
        .iter()
        .find(|r| r.name.as_str() == renderer)
        .and_then(|r| r.renderer_policy.as_ref())
        .expect("renderer must have a policy")
}

fn configuration<'d>(dispatch: &'d Dispatch, renderer: &str) -> Option<&'d Configuration> {
    renderer_policy(dispatch, renderer).configuration.as_ref()
}
