//! Outbound update and inbound frame definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::UpdateKind;

/// An immutable, kind-tagged event broadcast to subscribers.
///
/// On the wire this is `{"type": <kind>, "data": <payload>, "timestamp": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// Kind-specific structured data.
    #[serde(rename = "data")]
    pub payload: serde_json::Value,
    /// When the update was created.
    pub timestamp: DateTime<Utc>,
}

/// A request log entry streamed to subscribers as a `log_entry` update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Request ID (from `x-request-id` or generated).
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Peer address, if known.
    pub remote_addr: Option<String>,
    /// `User-Agent` header, if present.
    pub user_agent: Option<String>,
    /// Response status code.
    pub status: u16,
    /// Total handling time in milliseconds.
    pub latency_ms: f64,
    /// When the request started.
    pub timestamp: DateTime<Utc>,
}

/// Frames a client may send over an established session.
///
/// Anything else a client sends is logged and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Application-level keepalive; answered with a `pong` update.
    Ping {
        /// Client timestamp, echoed back in the reply.
        #[serde(default)]
        timestamp: Option<i64>,
    },
    /// Reply to a server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
}
