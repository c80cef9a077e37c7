//! Group-based policy indices and resolution.
//!
//! Each input collection is turned into an immutable index:
//!
//! - [`EndpointInfo`] indexes address and containment endpoints by key and by endpoint group.
//! - [`EndpointLocationInfo`] indexes where each endpoint resides.
//! - [`ResolvedPolicyInfo`] indexes consumer/provider policies and their rule groups.
//! - [`RendererTopology`] maps infrastructure nodes to the renderer that owns them.
//!
//! [`PolicyResolution`] walks these indices for a single renderer-owned endpoint, recording every
//! peer relation into a [`RendererConfigurationBuilder`], which then materializes the
//! configuration for one renderer:
//!
//! ```text
//! [ EndpointInfo ]  [ EndpointLocationInfo ]  [ ResolvedPolicyInfo ]
//!          \                 |                      /
//!           +------> [ PolicyResolution ] <--------+
//!                            |
//!              [ RendererConfigurationBuilder ] --> Configuration
//! ```
//!
//! Indices compare by value so that snapshots may be compared to detect changes.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod augment;
mod builder;
mod endpoint;
mod location;
mod policy;
mod resolve;
mod topology;


pub use self::{
    augment::AugmentorRegistry,
    builder::{BuildError, RendererConfigurationBuilder},
    endpoint::EndpointInfo,
    location::EndpointLocationInfo,
    policy::ResolvedPolicyInfo,
    resolve::PolicyResolution,
    topology::RendererTopology,
};
