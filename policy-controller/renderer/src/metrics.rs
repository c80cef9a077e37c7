use gbp_policy_controller_core::{renderer::Version, RendererName};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct ControllerMetrics {
    dispatches: Counter,
    dispatch_failures: Counter,
    acknowledgements: Family<AckLabels, Counter>,
    ack_timeouts: Counter,
    build_failures: Family<RendererLabels, Counter>,
    version: Gauge,
    pending_renderers: Gauge,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct AckLabels {
    renderer: String,
    result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RendererLabels {
    renderer: String,
}

// === impl ControllerMetrics ===

impl ControllerMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let dispatches = Counter::default();
        prom.register(
            "dispatches",
            "Count of policy versions written to the renderers",
            dispatches.clone(),
        );

        let dispatch_failures = Counter::default();
        prom.register(
            "dispatch_failures",
            "Count of policy versions that could not be written",
            dispatch_failures.clone(),
        );

        let acknowledgements = Family::default();
        prom.register(
            "acknowledgements",
            "Count of policy versions acknowledged by renderers",
            acknowledgements.clone(),
        );

        let ack_timeouts = Counter::default();
        prom.register(
            "ack_timeouts",
            "Count of policy versions abandoned while waiting for acknowledgements",
            ack_timeouts.clone(),
        );

        let build_failures = Family::default();
        prom.register(
            "build_failures",
            "Count of renderer configurations that could not be built",
            build_failures.clone(),
        );

        let version = Gauge::default();
        prom.register("version", "The last dispatched policy version", version.clone());

        let pending_renderers = Gauge::default();
        prom.register(
            "pending_renderers",
            "Number of renderers that have not acknowledged the last dispatched version",
            pending_renderers.clone(),
        );

        Self {
            dispatches,
            dispatch_failures,
            acknowledgements,
            ack_timeouts,
            build_failures,
            version,
            pending_renderers,
        }
    }

    pub(crate) fn dispatched(&self, version: Version, pending: usize) {
        self.dispatches.inc();
        self.version.set(version as i64);
        self.pending_renderers.set(pending as i64);
    }

    pub(crate) fn dispatch_failed(&self) {
        self.dispatch_failures.inc();
        self.pending_renderers.set(0);
    }

    pub(crate) fn acknowledged(&self, renderer: &RendererName, partial: bool, pending: usize) {
        let result = if partial { "partial" } else { "configured" };
        self.acknowledgements
            .get_or_create(&AckLabels {
                renderer: renderer.to_string(),
                result: result.to_string(),
            })
            .inc();
        self.pending_renderers.set(pending as i64);
    }

    pub(crate) fn ack_timed_out(&self) {
        self.ack_timeouts.inc();
        self.pending_renderers.set(0);
    }

    pub(crate) fn build_failed(&self, renderer: &RendererName) {
        self.build_failures
            .get_or_create(&RendererLabels {
                renderer: renderer.to_string(),
            })
            .inc();
    }
}
