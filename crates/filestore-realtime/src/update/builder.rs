//! Constructors for updates.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::connection::handle::ConnectionId;
use crate::error::HubError;

use super::kind::UpdateKind;
use super::types::{LogEntry, Update};

impl Update {
    /// Create an update from a kind and an already-built payload.
    pub fn new(kind: impl Into<UpdateKind>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create an update by serializing any payload type.
    pub fn from_payload<T: Serialize>(
        kind: impl Into<UpdateKind>,
        payload: &T,
    ) -> Result<Self, HubError> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    /// Announcement that `id` joined. The payload is the bare identity.
    pub fn user_joined(id: &ConnectionId) -> Self {
        Self::new(UpdateKind::UserJoined, json!(id.as_str()))
    }

    /// Announcement that `id` left or was evicted.
    pub fn user_left(id: &ConnectionId) -> Self {
        Self::new(UpdateKind::UserLeft, json!(id.as_str()))
    }

    /// Handshake acknowledgement for a new connection.
    pub fn connected(id: &ConnectionId) -> Self {
        Self::new(UpdateKind::Connected, json!({ "client_id": id.as_str() }))
    }

    /// Reply to an inbound ping.
    pub fn pong(echo: Option<i64>) -> Self {
        Self::new(
            UpdateKind::Pong,
            json!({ "timestamp": echo, "server_time": Utc::now().timestamp_millis() }),
        )
    }

    /// A request log entry.
    pub fn log_entry(entry: &LogEntry) -> Result<Self, HubError> {
        Self::from_payload(UpdateKind::LogEntry, entry)
    }
}
