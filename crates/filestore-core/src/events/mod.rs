//! Domain events emitted by filestore operations.
//!
//! The storage and database layers emit these after a mutation commits.
//! The real-time hub consumes them through its event bridge and turns them
//! into updates for connected clients.

pub mod collection;
pub mod file;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use collection::CollectionEvent;
pub use file::FileEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<Uuid>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A file-related event.
    File(FileEvent),
    /// A collection-related event.
    Collection(CollectionEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<Uuid>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }
}

impl From<FileEvent> for EventPayload {
    fn from(event: FileEvent) -> Self {
        Self::File(event)
    }
}

impl From<CollectionEvent> for EventPayload {
    fn from(event: CollectionEvent) -> Self {
        Self::Collection(event)
    }
}
