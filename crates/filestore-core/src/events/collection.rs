//! Collection-related domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to collection operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollectionEvent {
    /// A collection was created.
    Created {
        /// The collection ID.
        collection_id: Uuid,
        /// The owning user.
        user_id: Uuid,
        /// The collection name.
        name: String,
        /// Free-form description.
        description: String,
    },
    /// A collection's name or description changed.
    Updated {
        /// The collection ID.
        collection_id: Uuid,
        /// The new name.
        name: String,
        /// The new description.
        description: String,
    },
    /// A collection was deleted.
    Deleted {
        /// The collection ID.
        collection_id: Uuid,
    },
}
