//! Errors raised by the real-time hub.

use thiserror::Error;

use filestore_core::error::{AppError, ErrorKind};

use crate::connection::handle::ConnectionId;

/// Errors produced by hub operations and by individual connections.
#[derive(Debug, Error)]
pub enum HubError {
    /// `register` was called with an identity that is already registered.
    #[error("connection '{0}' is already registered")]
    DuplicateIdentity(ConnectionId),
    /// The hub has been stopped; the caller should treat the subscriber as
    /// disconnected.
    #[error("hub stopped")]
    HubStopped,
    /// The hub has not been started yet.
    #[error("hub not started")]
    HubNotStarted,
    /// `start` was called on a hub that is already running.
    #[error("hub already started")]
    HubAlreadyStarted,
    /// The connection's outbound queue overflowed and it was evicted.
    #[error("connection '{0}' evicted: outbound queue full")]
    SubscriberEvicted(ConnectionId),
    /// The transport side of the connection is gone.
    #[error("connection '{0}' disconnected")]
    SubscriberDisconnected(ConnectionId),
    /// An inbound frame was rejected before parsing.
    #[error("invalid inbound frame: {0}")]
    InvalidFrame(String),
    /// An update or frame could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<HubError> for AppError {
    fn from(err: HubError) -> Self {
        let kind = match &err {
            HubError::DuplicateIdentity(_) => ErrorKind::Conflict,
            HubError::HubStopped | HubError::HubNotStarted => ErrorKind::ServiceUnavailable,
            HubError::InvalidFrame(_) => ErrorKind::Validation,
            HubError::Serialization(_) => ErrorKind::Serialization,
            HubError::HubAlreadyStarted
            | HubError::SubscriberEvicted(_)
            | HubError::SubscriberDisconnected(_) => ErrorKind::Internal,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
