//! Domain event → update bridge.

pub mod event_bridge;

pub use event_bridge::EventBridge;
