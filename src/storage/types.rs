//! Types and constants for the object store.

use chrono::{DateTime, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

/// Table for object metadata in the filesystem backend.
pub(crate) const OBJECTS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("objects");

/// File name of the filesystem backend's metadata database.
pub(crate) const METADATA_DB_FILE: &str = "metadata.redb";

/// Metadata for a stored object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Key of the object (e.g., "posts/abc/meta.json")
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// MIME content type (e.g., "image/png", "application/json")
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// An object as seen through [`ObjectStore`](super::ObjectStore): its
/// metadata plus the public URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub meta: ObjectMeta,
}

/// Resolve a content type, falling back to a guess from the key's extension.
pub(crate) fn resolve_content_type(key: &str, content_type: Option<&str>) -> String {
    content_type
        .map(std::string::ToString::to_string)
        .or_else(|| mime_guess::from_path(key).first().map(|mime| mime.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
