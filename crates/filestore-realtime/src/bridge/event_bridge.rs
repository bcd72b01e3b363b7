//! Domain event → update mapping.
//!
//! Storage and database handlers report completed mutations as
//! [`DomainEvent`]s; the bridge turns each into the matching update and
//! publishes it without waiting for delivery.

use serde_json::json;
use tracing::debug;

use filestore_core::events::{CollectionEvent, DomainEvent, EventPayload, FileEvent};

use crate::error::HubError;
use crate::hub::Hub;
use crate::update::{Update, UpdateKind};

/// Publishes domain events into the hub.
#[derive(Debug, Clone)]
pub struct EventBridge {
    hub: Hub,
}

impl EventBridge {
    /// Create a new event bridge
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Publish the update for `event`.
    pub fn on_event(&self, event: &DomainEvent) -> Result<(), HubError> {
        let update = update_for(event);
        debug!(event_id = %event.id, kind = %update.kind, "Bridging domain event");
        self.hub.publish(update)
    }
}

/// The update broadcast for a domain event.
pub fn update_for(event: &DomainEvent) -> Update {
    let (kind, payload) = match &event.payload {
        EventPayload::File(FileEvent::Uploaded {
            file_id,
            key,
            name,
            size_bytes,
            content_type,
            collection_id,
        }) => (
            UpdateKind::FileUploaded,
            json!({
                "file_id": file_id,
                "key": key,
                "name": name,
                "size": size_bytes,
                "content_type": content_type,
                "collection_id": collection_id,
            }),
        ),
        EventPayload::File(FileEvent::Deleted { file_id, key, name }) => (
            UpdateKind::FileDeleted,
            json!({ "file_id": file_id, "key": key, "name": name }),
        ),
        EventPayload::Collection(CollectionEvent::Created {
            collection_id,
            user_id,
            name,
            description,
        }) => (
            UpdateKind::CollectionCreated,
            json!({
                "id": collection_id,
                "user_id": user_id,
                "name": name,
                "description": description,
            }),
        ),
        EventPayload::Collection(CollectionEvent::Updated {
            collection_id,
            name,
            description,
        }) => (
            UpdateKind::CollectionUpdated,
            json!({ "id": collection_id, "name": name, "description": description }),
        ),
        EventPayload::Collection(CollectionEvent::Deleted { collection_id }) => (
            UpdateKind::CollectionDeleted,
            json!({ "id": collection_id }),
        ),
    };

    let mut update = Update::new(kind, payload);
    if let (Some(actor), Some(map)) = (event.actor_id, update.payload.as_object_mut()) {
        map.insert("actor_id".to_string(), json!(actor));
    }
    update.timestamp = event.timestamp;
    update
}
