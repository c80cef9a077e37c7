#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use gbp_policy_controller_core as core;
pub use gbp_policy_controller_index as index;
pub use gbp_policy_controller_renderer as renderer;

mod admin;
mod args;
mod log;
mod store;

pub use self::{
    args::Args,
    log::LogFormat,
    store::{Datastore, DatastoreWatch, FileStore},
};
