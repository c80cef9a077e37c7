use crate::{Dispatch, Event, Phase, RendererManager};
use anyhow::{anyhow, Result};
use gbp_policy_controller_core::{renderer::Version, store::RendererStore};
use tokio::{
    sync::{mpsc, watch},
    time,
};

/// Drives a [`RendererManager`] from a queue of events, writing each dispatched version to the
/// store.
///
/// All state is owned by the controller task, so events are applied strictly one at a time and
/// a write completes before the next event is considered.
pub struct Controller<S> {
    manager: RendererManager,
    store: S,
    events: mpsc::Receiver<Event>,
    write_timeout: time::Duration,
    ack_timeout: Option<time::Duration>,
    ready: watch::Sender<bool>,
}

// === impl Controller ===

impl<S: RendererStore> Controller<S> {
    pub fn new(
        manager: RendererManager,
        store: S,
        events: mpsc::Receiver<Event>,
        write_timeout: time::Duration,
    ) -> (Self, watch::Receiver<bool>) {
        let (ready, ready_rx) = watch::channel(false);
        let ctrl = Self {
            manager,
            store,
            events,
            write_timeout,
            ack_timeout: None,
            ready,
        };
        (ctrl, ready_rx)
    }

    /// Abandons versions that are not acknowledged by every renderer within `timeout`.
    ///
    /// By default the controller waits for acknowledgements indefinitely.
    pub fn with_ack_timeout(mut self, timeout: Option<time::Duration>) -> Self {
        self.ack_timeout = timeout;
        self
    }

    #[tracing::instrument(name = "renderer_manager", skip_all)]
    pub async fn run(mut self, drain: drain::Watch) {
        tokio::pin! {
            let shutdown = drain.signaled();
        }

        let mut ack_deadline = None::<(Version, time::Instant)>;
        loop {
            let deadline = ack_deadline.map(|(_, at)| at);
            let dispatch = tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        let dispatch = self.manager.handle(event);
                        let _ = self.ready.send(true);
                        dispatch
                    }
                    None => {
                        tracing::debug!("Event stream closed");
                        return;
                    }
                },

                _ = time::sleep_until(deadline.unwrap_or_else(time::Instant::now)),
                    if deadline.is_some() =>
                {
                    ack_deadline = None;
                    self.manager.abandon_version()
                }

                _ = &mut shutdown => {
                    tracing::debug!("Shutdown");
                    return;
                }
            };

            if let Some(dispatch) = dispatch {
                let res = self.write(dispatch).await;
                self.manager.complete_dispatch(res);
            }

            let status = self.manager.status();
            ack_deadline = match (status.phase, ack_deadline, self.ack_timeout) {
                (Phase::AwaitingAck, Some((version, at)), _) if version == status.version => {
                    Some((version, at))
                }
                (Phase::AwaitingAck, _, Some(timeout)) => {
                    Some((status.version, time::Instant::now() + timeout))
                }
                _ => None,
            };
        }
    }

    async fn write(&self, Dispatch { version, renderers }: Dispatch) -> Result<()> {
        tracing::debug!(
            version,
            renderers = renderers.renderers.len(),
            "Writing renderer policies"
        );
        match time::timeout(self.write_timeout, self.store.put_renderer_policies(renderers)).await {
            Ok(res) => res,
            Err(_) => Err(anyhow!("write timed out after {:?}", self.write_timeout)),
        }
    }
}
