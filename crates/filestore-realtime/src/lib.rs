//! # filestore-realtime
//!
//! Real-time update hub for the filestore backend. Provides:
//!
//! - A registry of live subscriber connections keyed by identity
//! - A single control loop that serializes registration and fan-out
//! - Bounded per-connection queues with drop-and-evict backpressure
//! - A transport-agnostic session driver (read loop + write loop)
//! - A bridge from storage/database domain events to updates

pub mod bridge;
pub mod connection;
pub mod error;
pub mod hub;
pub mod metrics;
pub mod session;
pub mod update;

pub use bridge::EventBridge;
pub use connection::{CloseReason, ConnectionId, Subscriber};
pub use error::HubError;
pub use hub::{Hub, HubState};
pub use update::{Update, UpdateKind};
