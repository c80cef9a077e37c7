use crate::{ControllerMetrics, InputState};
use gbp_policy_controller_core::{
    endpoint::Endpoints,
    forwarding::Forwarding,
    location::EndpointLocations,
    policy::ResolvedPolicies,
    renderer::{Configuration, Renderer, RendererPolicy, Renderers, Status, Version},
    RendererName,
};
use gbp_policy_controller_index::{
    AugmentorRegistry, EndpointInfo, EndpointLocationInfo, RendererTopology, ResolvedPolicyInfo,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// An input to the renderer manager.
#[derive(Clone, Debug)]
pub enum Event {
    EndpointsUpdated(Endpoints),
    LocationsUpdated(EndpointLocations),
    PoliciesUpdated(ResolvedPolicies),
    ForwardingUpdated(Forwarding),
    /// The renderer collection changed. Renderer policies carried by the collection acknowledge
    /// the versions they report.
    TopologyUpdated(Renderers),
    RendererAcked(RendererAck),
}

/// A renderer's report that it has processed a policy version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererAck {
    pub name: RendererName,
    pub version: Version,
    pub status: Option<Status>,
}

/// A new policy version that must be written to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub version: Version,
    pub renderers: Renderers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerStatus {
    pub version: Version,
    pub pending: BTreeSet<RendererName>,
    pub phase: Phase,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingAck,
}

/// Computes renderer configurations from the input feeds and drives the versioned dispatch
/// protocol.
///
/// At most one version is outstanding at a time: while any renderer has not acknowledged the
/// last dispatched version, input updates are recorded but nothing new is dispatched.
#[derive(Debug)]
pub struct RendererManager {
    current: InputState,
    /// The snapshot from which the last successful dispatch was computed.
    configured: InputState,

    version: Version,
    processing: BTreeSet<RendererName>,
    /// Whether the last dispatched version carried any configuration.
    has_config: bool,
    dispatched: BTreeMap<RendererName, Option<Configuration>>,
    in_flight: Option<InFlight>,

    augmentors: AugmentorRegistry,
    metrics: ControllerMetrics,
}

#[derive(Debug)]
struct InFlight {
    state: InputState,
    configs: BTreeMap<RendererName, Option<Configuration>>,
    has_config: bool,
}

// === impl RendererManager ===

impl RendererManager {
    pub fn new(augmentors: AugmentorRegistry, metrics: ControllerMetrics) -> Self {
        Self {
            current: InputState::default(),
            configured: InputState::default(),
            version: 0,
            processing: BTreeSet::new(),
            has_config: false,
            dispatched: BTreeMap::new(),
            in_flight: None,
            augmentors,
            metrics,
        }
    }

    pub fn status(&self) -> ManagerStatus {
        let phase = if self.processing.is_empty() && self.in_flight.is_none() {
            Phase::Idle
        } else {
            Phase::AwaitingAck
        };
        ManagerStatus {
            version: self.version,
            pending: self.processing.clone(),
            phase,
        }
    }

    pub fn current(&self) -> &InputState {
        &self.current
    }

    /// Applies an update and returns the version that must be dispatched as a result, if any.
    ///
    /// A returned dispatch must be completed with [`Self::complete_dispatch`] before any further
    /// version can be produced.
    pub fn handle(&mut self, event: Event) -> Option<Dispatch> {
        match event {
            Event::EndpointsUpdated(endpoints) => {
                self.current.endpoints = Some(Arc::new(EndpointInfo::new(&endpoints)));
            }
            Event::LocationsUpdated(locations) => {
                self.current.locations = Some(Arc::new(EndpointLocationInfo::new(&locations)));
            }
            Event::PoliciesUpdated(policies) => {
                self.current.policies = Some(Arc::new(ResolvedPolicyInfo::new(&policies)));
            }
            Event::ForwardingUpdated(forwarding) => {
                self.current.forwarding = Some(Arc::new(forwarding));
            }
            Event::TopologyUpdated(renderers) => self.update_topology(renderers),
            Event::RendererAcked(RendererAck {
                name,
                version,
                status,
            }) => self.acknowledge(&name, version, status.as_ref()),
        }
        self.process_state()
    }

    fn update_topology(&mut self, renderers: Renderers) {
        self.current.topology = Arc::new(RendererTopology::new(&renderers.renderers));

        for Renderer {
            name,
            renderer_policy,
            ..
        } in &renderers.renderers
        {
            if let Some(RendererPolicy {
                version: Some(version),
                status,
                ..
            }) = renderer_policy
            {
                self.acknowledge(name, *version, status.as_ref());
            }
        }

        // A renderer that left the collection can never acknowledge.
        let names = renderers
            .renderers
            .iter()
            .map(|r| &r.name)
            .collect::<BTreeSet<_>>();
        let removed = self
            .processing
            .iter()
            .filter(|name| !names.contains(name))
            .cloned()
            .collect::<Vec<_>>();
        for name in removed {
            tracing::warn!(
                renderer = %name,
                version = self.version,
                "Renderer removed before acknowledging"
            );
            self.processing.remove(&name);
        }
    }

    fn acknowledge(&mut self, name: &RendererName, version: Version, status: Option<&Status>) {
        if version != self.version || !self.processing.remove(name) {
            return;
        }

        let unconfigured = status.map_or(0, |s| s.unconfigured_endpoints.len());
        if unconfigured > 0 {
            tracing::warn!(
                renderer = %name,
                version,
                unconfigured,
                "Renderer did not configure all endpoints"
            );
        } else {
            tracing::debug!(renderer = %name, version, "Renderer configured policy");
        }
        self.metrics
            .acknowledged(name, unconfigured > 0, self.processing.len());

        if self.processing.is_empty() {
            tracing::info!(version, "All renderers acknowledged policy");
        }
    }

    /// Stops waiting for renderers that have not acknowledged the current version.
    ///
    /// The abandoned version number is never reused. Returns the next version to dispatch, if
    /// the inputs changed while waiting.
    pub fn abandon_version(&mut self) -> Option<Dispatch> {
        if self.processing.is_empty() {
            return None;
        }
        tracing::warn!(
            version = self.version,
            pending = ?self.processing,
            "Renderers did not acknowledge policy in time"
        );
        self.processing.clear();
        self.metrics.ack_timed_out();
        self.process_state()
    }

    /// Records the outcome of writing the dispatched version.
    ///
    /// When the write failed, the version is rolled back and the configured snapshot is left
    /// untouched so that the next update retries.
    pub fn complete_dispatch(&mut self, result: anyhow::Result<()>) {
        let InFlight {
            state,
            configs,
            has_config,
        } = match self.in_flight.take() {
            Some(in_flight) => in_flight,
            None => return,
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    version = self.version,
                    renderers = ?self.processing,
                    "Dispatched policy"
                );
                self.configured = state;
                self.dispatched = configs;
                self.has_config = has_config;
                self.metrics.dispatched(self.version, self.processing.len());
            }
            Err(error) => {
                tracing::warn!(
                    version = self.version,
                    %error,
                    "Failed to dispatch policy; the previous version remains valid"
                );
                self.version -= 1;
                self.processing.clear();
                self.metrics.dispatch_failed();
            }
        }
    }

    fn process_state(&mut self) -> Option<Dispatch> {
        if self.in_flight.is_some() {
            return None;
        }
        if !self.processing.is_empty() {
            tracing::debug!(
                version = self.version,
                pending = ?self.processing,
                "Waiting for renderers"
            );
            return None;
        }
        if self.current.topology.is_empty() {
            return None;
        }
        if self.current == self.configured {
            return None;
        }

        let configs = self.configurations();
        let has_config = configs.values().any(Option::is_some);
        if !(has_config || self.has_config) || configs == self.dispatched {
            tracing::trace!("No configuration changes to dispatch");
            self.configured = self.current.clone();
            return None;
        }

        self.version += 1;
        self.processing = configs.keys().cloned().collect();
        let renderers = configs
            .iter()
            .map(|(name, configuration)| {
                tracing::debug!(
                    renderer = %name,
                    version = self.version,
                    configured = configuration.is_some(),
                    "Created renderer policy"
                );
                Renderer {
                    name: name.clone(),
                    renderer_nodes: vec![],
                    renderer_policy: Some(RendererPolicy {
                        version: Some(self.version),
                        configuration: configuration.clone(),
                        status: None,
                    }),
                }
            })
            .collect();
        self.in_flight = Some(InFlight {
            state: self.current.clone(),
            configs,
            has_config,
        });

        Some(Dispatch {
            version: self.version,
            renderers: Renderers { renderers },
        })
    }

    fn configurations(&self) -> BTreeMap<RendererName, Option<Configuration>> {
        self.current
            .configurations(&self.augmentors)
            .into_iter()
            .map(|(name, config)| {
                let config = config.unwrap_or_else(|error| {
                    tracing::error!(renderer = %name, %error, "Failed to build configuration");
                    self.metrics.build_failed(&name);
                    None
                });
                (name, config)
            })
            .collect()
    }
}
