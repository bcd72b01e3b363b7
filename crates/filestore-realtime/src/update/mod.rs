//! Update model: the kind-tagged events fanned out to subscribers, plus
//! the inbound control frames a transport may receive.

pub mod builder;
pub mod kind;
pub mod serializer;
pub mod types;
pub mod validator;

pub use kind::UpdateKind;
pub use types::{InboundFrame, LogEntry, Update};
