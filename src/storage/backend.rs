//! Backend trait for the object store.
//!
//! Defines the interface every storage backend implements, so the post
//! repository works the same over memory, the local filesystem, or a remote
//! object service.

use super::types::ObjectMeta;
use anyhow::Result;
use async_trait::async_trait;

/// Backend trait for key-addressed object storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// No cross-key atomicity is assumed; a single key is expected to be
/// readable after it has been written.
///
/// # Example
///
/// ```ignore
/// use poststage::storage::{MemoryStorageBackend, StorageBackend};
///
/// let backend = MemoryStorageBackend::new();
/// backend.put("posts/a/image-1.png", &image_bytes, Some("image/png")).await?;
/// let (data, meta) = backend.get("posts/a/image-1.png").await?.unwrap();
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Stores an object, replacing any existing object under the same key.
    ///
    /// `content_type` is guessed from the key's extension when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<ObjectMeta>;

    /// Retrieves an object and its metadata.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the read fails.
    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, ObjectMeta)>>;

    /// Deletes an object.
    ///
    /// Returns `Ok(false)` if the object did not exist; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or deletion fails.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Retrieves object metadata without reading the object.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or metadata cannot be read.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;

    /// Lists objects whose key starts with `prefix`, sorted by key.
    ///
    /// Returns an empty vector when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>>;
}
