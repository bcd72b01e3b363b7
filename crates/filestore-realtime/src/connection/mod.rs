//! Subscriber connections: queue handles and the registry of live ones.

pub mod handle;
pub mod registry;

pub use handle::{CloseReason, Connection, ConnectionId, ConnectionInfo, Subscriber};
pub use registry::Registry;
