//! File-related domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to file operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileEvent {
    /// A file was uploaded to object storage and recorded.
    Uploaded {
        /// The file ID.
        file_id: Uuid,
        /// The object-storage key.
        key: String,
        /// The original file name.
        name: String,
        /// The file size in bytes.
        size_bytes: u64,
        /// The content type (if known).
        content_type: Option<String>,
        /// The collection the file was filed under, if any.
        collection_id: Option<Uuid>,
    },
    /// A file was deleted from object storage and the database.
    Deleted {
        /// The file ID.
        file_id: Uuid,
        /// The object-storage key.
        key: String,
        /// The file name (for display after deletion).
        name: String,
    },
}
