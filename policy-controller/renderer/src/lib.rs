//! The renderer manager.
//!
//! Input feeds (endpoints, endpoint locations, resolved policies, forwarding and the renderer
//! collection) update an [`InputState`] snapshot. Whenever the snapshot changes and no version is
//! outstanding, the [`RendererManager`] recomputes every renderer's configuration and, if the
//! result differs from what was last dispatched, produces a new version for all renderers. The
//! [`Controller`] owns the manager, applies events one at a time and performs the write.
//!
//! Renderers acknowledge a version by reporting it back through the renderer collection; no new
//! version is dispatched until every renderer has acknowledged the outstanding one.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod controller;
mod manager;
mod metrics;
mod state;

#[cfg(test)]
mod tests;

pub use self::{
    controller::Controller,
    manager::{Dispatch, Event, ManagerStatus, Phase, RendererAck, RendererManager},
    metrics::ControllerMetrics,
    state::InputState,
};
