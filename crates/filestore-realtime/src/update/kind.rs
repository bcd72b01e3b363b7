//! Update kinds.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind tag carried by every [`Update`](super::Update).
///
/// Serialized as its snake_case wire name. Kinds not known to this crate
/// round-trip through [`UpdateKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UpdateKind {
    /// An object was uploaded to storage.
    FileUploaded,
    /// An object was deleted from storage.
    FileDeleted,
    /// A collection was created.
    CollectionCreated,
    /// A collection was renamed or re-described.
    CollectionUpdated,
    /// A collection was deleted.
    CollectionDeleted,
    /// Another subscriber connected.
    UserJoined,
    /// Another subscriber disconnected or was evicted.
    UserLeft,
    /// An HTTP request log entry.
    LogEntry,
    /// Handshake acknowledgement sent to a freshly registered connection.
    Connected,
    /// Reply to an inbound `ping` frame.
    Pong,
    /// Producer-defined kind.
    Custom(String),
}

impl UpdateKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FileUploaded => "file_uploaded",
            Self::FileDeleted => "file_deleted",
            Self::CollectionCreated => "collection_created",
            Self::CollectionUpdated => "collection_updated",
            Self::CollectionDeleted => "collection_deleted",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::LogEntry => "log_entry",
            Self::Connected => "connected",
            Self::Pong => "pong",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "file_uploaded" => Self::FileUploaded,
            "file_deleted" => Self::FileDeleted,
            "collection_created" => Self::CollectionCreated,
            "collection_updated" => Self::CollectionUpdated,
            "collection_deleted" => Self::CollectionDeleted,
            "user_joined" => Self::UserJoined,
            "user_left" => Self::UserLeft,
            "log_entry" => Self::LogEntry,
            "connected" => Self::Connected,
            "pong" => Self::Pong,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl From<String> for UpdateKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for UpdateKind {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<UpdateKind> for String {
    fn from(kind: UpdateKind) -> Self {
        match kind {
            UpdateKind::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
