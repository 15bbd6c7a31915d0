//! Key-addressed object storage for post metadata and images.
//!
//! [`ObjectStore`] wraps any [`StorageBackend`] and gives every stored
//! object a public URL (`{public_base}/blobs/{key}`), which is what posts
//! reference their images by. Two backends ship with the crate:
//!
//! - [`MemoryStorageBackend`] - DashMap, non-persistent
//! - [`FilesystemBackend`] - files on disk with metadata in redb
//!
//! The store is treated as eventually consistent with no cross-key
//! atomicity; callers must not rely on a multi-object write being all or
//! nothing.

mod backend;
mod filesystem;
mod memory;
mod metadata;
mod types;
mod validation;

pub use backend::StorageBackend;
pub use filesystem::FilesystemBackend;
pub use memory::MemoryStorageBackend;
pub use types::{ObjectMeta, StoredObject};

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Path segment under which objects are served over HTTP.
pub const BLOB_ROUTE: &str = "/blobs/";

/// Whether `key` is acceptable to every backend (relative, no `..`).
pub fn is_valid_key(key: &str) -> bool {
    validation::validate_key(key).is_ok()
}

/// Object store facade over a pluggable backend.
///
/// `ObjectStore` is `Clone`; clones share the backend.
#[derive(Clone)]
pub struct ObjectStore {
    backend: Arc<dyn StorageBackend>,
    public_base: String,
}

impl ObjectStore {
    /// Creates a store backed by memory.
    ///
    /// `public_base` is the externally reachable base URL of the server,
    /// e.g. `http://localhost:3000`.
    pub fn memory(public_base: &str) -> Self {
        Self::custom(MemoryStorageBackend::new(), public_base)
    }

    /// Creates a store backed by files under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or its metadata database cannot be
    /// opened.
    pub fn filesystem<P: AsRef<Path>>(path: P, public_base: &str) -> Result<Self> {
        Ok(Self::custom(FilesystemBackend::open(path)?, public_base))
    }

    /// Creates a store with a custom backend.
    pub fn custom<B: StorageBackend>(backend: B, public_base: &str) -> Self {
        Self::from_arc(Arc::new(backend), public_base)
    }

    /// Creates a store from a shared backend.
    pub fn from_arc(backend: Arc<dyn StorageBackend>, public_base: &str) -> Self {
        Self {
            backend,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public URL for `key`.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}{}", self.public_base, BLOB_ROUTE, key)
    }

    /// Extracts the key from a URL produced by [`url_for`](Self::url_for).
    ///
    /// Returns `None` for URLs that point elsewhere.
    pub fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base.as_str())?
            .strip_prefix(BLOB_ROUTE)
            .filter(|key| !key.is_empty())
    }

    /// Stores an object and returns it with its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend write fails.
    pub async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject> {
        let meta = self.backend.put(key, data, Some(content_type)).await?;
        Ok(self.to_stored(meta))
    }

    /// Reads an object's bytes. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.backend.get(key).await?.map(|(data, _)| data))
    }

    /// Reads an object's bytes together with its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn get_with_meta(&self, key: &str) -> Result<Option<(Vec<u8>, ObjectMeta)>> {
        self.backend.get(key).await
    }

    /// Fetches an object by its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not belong to this store or the read
    /// fails.
    pub async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let key = self
            .key_for_url(url)
            .ok_or_else(|| anyhow::anyhow!("URL is not served by this store: {url}"))?;
        self.get(key).await
    }

    /// Checks whether an object exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend lookup fails.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.backend.head(key).await?.is_some())
    }

    /// Lists objects under `prefix`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend listing fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let objects = self.backend.list(Some(prefix)).await?;
        Ok(objects.into_iter().map(|meta| self.to_stored(meta)).collect())
    }

    /// Deletes an object. Deleting a missing object returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.backend.delete(key).await
    }

    fn to_stored(&self, meta: ObjectMeta) -> StoredObject {
        StoredObject {
            key: meta.key.clone(),
            url: self.url_for(&meta.key),
            meta,
        }
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("public_base", &self.public_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_returns_public_url() {
        let store = ObjectStore::memory("http://localhost:3000/");
        let obj = store
            .put("posts/a/image-1.png", b"png", "image/png")
            .await
            .unwrap();

        assert_eq!(obj.url, "http://localhost:3000/blobs/posts/a/image-1.png");
        assert_eq!(obj.meta.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_fetch_by_url() {
        let store = ObjectStore::memory("http://localhost:3000");
        let obj = store
            .put("posts/a/meta.json", b"{}", "application/json")
            .await
            .unwrap();

        assert_eq!(store.fetch(&obj.url).await.unwrap().unwrap(), b"{}");
        assert!(store.fetch("https://elsewhere.example/blobs/x").await.is_err());
    }

    #[test]
    fn test_key_for_url() {
        let store = ObjectStore::memory("https://stage.example.com");
        assert_eq!(
            store.key_for_url("https://stage.example.com/blobs/posts/a/meta.json"),
            Some("posts/a/meta.json")
        );
        assert_eq!(store.key_for_url("https://stage.example.com/blobs/"), None);
        assert_eq!(store.key_for_url("https://cdn.example.com/a.png"), None);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = ObjectStore::memory("http://localhost:3000");
        store.put("posts/a/meta.json", b"{}", "application/json").await.unwrap();
        store.put("posts/a/image-1.png", b"png", "image/png").await.unwrap();

        let listed = store.list("posts/a/").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(store.exists("posts/a/meta.json").await.unwrap());

        assert!(store.delete("posts/a/meta.json").await.unwrap());
        assert!(!store.delete("posts/a/meta.json").await.unwrap());
        assert!(!store.exists("posts/a/meta.json").await.unwrap());
    }
}
