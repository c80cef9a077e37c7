//! A data store backed by JSON documents on the local filesystem.
//!
//! Input collections are read from a single datastore document that is polled for changes.
//! Renderer policies are written to a separate output document, so that the controller's own
//! writes are never mistaken for renderer acknowledgements.

use anyhow::{Context, Result};
use gbp_policy_controller_core::{
    endpoint::Endpoints, forwarding::Forwarding, location::EndpointLocations,
    policy::ResolvedPolicies, renderer::Renderers, store::RendererStore,
};
use gbp_policy_controller_renderer::Event;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::{sync::mpsc, time};

/// The input collections, each of which may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Datastore {
    #[serde(default)]
    pub endpoints: Option<Endpoints>,
    #[serde(default)]
    pub endpoint_locations: Option<EndpointLocations>,
    #[serde(default)]
    pub resolved_policies: Option<ResolvedPolicies>,
    #[serde(default)]
    pub forwarding: Option<Forwarding>,
    #[serde(default)]
    pub renderers: Option<Renderers>,
}

/// Writes renderer policies to the output document.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

/// Polls the datastore document and emits an event for each collection that changed.
#[derive(Debug)]
pub struct DatastoreWatch {
    path: PathBuf,
    interval: time::Duration,
    last: Datastore,
}

// === impl Datastore ===

impl Datastore {
    /// Returns the events that transform `prior` into `self`.
    ///
    /// A collection that disappears is reported as empty.
    pub fn changes(&self, prior: &Self) -> Vec<Event> {
        fn changed<T: Clone + Default + PartialEq>(
            curr: &Option<T>,
            prior: &Option<T>,
            mk: impl FnOnce(T) -> Event,
        ) -> Option<Event> {
            if curr == prior {
                return None;
            }
            Some(mk(curr.clone().unwrap_or_default()))
        }

        [
            changed(&self.endpoints, &prior.endpoints, Event::EndpointsUpdated),
            changed(
                &self.endpoint_locations,
                &prior.endpoint_locations,
                Event::LocationsUpdated,
            ),
            changed(
                &self.resolved_policies,
                &prior.resolved_policies,
                Event::PoliciesUpdated,
            ),
            changed(&self.forwarding, &prior.forwarding, Event::ForwardingUpdated),
            changed(&self.renderers, &prior.renderers, Event::TopologyUpdated),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// === impl FileStore ===

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl RendererStore for FileStore {
    /// Replaces the output document by writing a temporary file and renaming it into place.
    async fn put_renderer_policies(&self, renderers: Renderers) -> Result<()> {
        let json = serde_json::to_vec_pretty(&renderers)?;
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// === impl DatastoreWatch ===

impl DatastoreWatch {
    pub fn new(path: impl Into<PathBuf>, interval: time::Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last: Datastore::default(),
        }
    }

    /// Reads the datastore document and returns the events for collections that changed since
    /// the previous poll.
    ///
    /// A missing document reads as empty.
    pub async fn poll(&mut self) -> Result<Vec<Event>> {
        let curr = match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice::<Datastore>(&bytes)
                .with_context(|| format!("invalid datastore {}", self.path.display()))?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %self.path.display(), "Datastore not found");
                Datastore::default()
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        let events = curr.changes(&self.last);
        self.last = curr;
        Ok(events)
    }

    pub async fn run(mut self, events: mpsc::Sender<Event>, drain: drain::Watch) {
        tokio::pin! {
            let shutdown = drain.signaled();
        }

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut shutdown => {
                    tracing::debug!("Shutdown");
                    return;
                }
            }

            let updates = match self.poll().await {
                Ok(updates) => updates,
                Err(error) => {
                    tracing::warn!(%error, "Failed to read datastore");
                    continue;
                }
            };
            for event in updates {
                tracing::debug!(?event, "Datastore changed");
                if events.send(event).await.is_err() {
                    tracing::debug!("Controller stopped");
                    return;
                }
            }
        }
    }
}
