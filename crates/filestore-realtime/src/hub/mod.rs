//! The hub: a single control loop that owns the registry and fans out
//! updates, fronted by a cloneable handle producers call into.

pub mod command;
pub mod control;
pub mod engine;

pub use engine::{Hub, HubState};
