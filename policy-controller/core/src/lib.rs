//! Shared model for the group-based policy controller.
//!
//! Inputs (endpoints, endpoint locations, resolved policies, forwarding and the renderer
//! collection) are pushed by the data store; outputs are per-renderer policies written back to
//! the same store. Everything here is a plain value type: equality is structural so that
//! snapshots of these collections can be compared to detect changes.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod augment;
pub mod endpoint;
pub mod forwarding;
mod ids;
pub mod location;
pub mod policy;
pub mod renderer;
pub mod store;

pub use self::ids::*;

/// The endpoint group reserved for endpoints that live entirely outside of the managed domain.
///
/// Such endpoints are never the renderer-side subject of a policy relation.
pub const EXTERNAL_EPG_ID: &str = "eeeaa3a2-e9ba-44e0-a462-bea923d30e38";
