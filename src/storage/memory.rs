//! In-memory storage backend.
//!
//! Non-persistent object store on top of DashMap. Used by tests and by
//! `backend = "memory"` for throwaway local runs.

use super::backend::StorageBackend;
use super::types::{ObjectMeta, resolve_content_type};
use super::validation::validate_key;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

#[derive(Clone)]
struct MemoryObject {
    data: Vec<u8>,
    meta: ObjectMeta,
}

/// In-memory object storage backend using DashMap.
///
/// All data is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStorageBackend {
    data: DashMap<String, MemoryObject>,
}

impl MemoryStorageBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<ObjectMeta> {
        let key = validate_key(key)?;
        let content_type = resolve_content_type(&key, content_type);

        let now = Utc::now();
        let created_at = self
            .data
            .get(&key)
            .map_or(now, |existing| existing.meta.created_at);
        let meta = ObjectMeta {
            key: key.clone(),
            size: data.len() as u64,
            content_type,
            created_at,
            modified_at: now,
        };

        self.data.insert(
            key,
            MemoryObject {
                data: data.to_vec(),
                meta: meta.clone(),
            },
        );

        Ok(meta)
    }

    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, ObjectMeta)>> {
        let key = validate_key(key)?;
        Ok(self.data.get(&key).map(|entry| {
            let obj = entry.value();
            (obj.data.clone(), obj.meta.clone())
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.data.remove(&key).is_some())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let key = validate_key(key)?;
        Ok(self.data.get(&key).map(|entry| entry.value().meta.clone()))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let mut objects: Vec<ObjectMeta> = self
            .data
            .iter()
            .filter(|entry| prefix.is_none_or(|prefix| entry.key().starts_with(prefix)))
            .map(|entry| entry.value().meta.clone())
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MemoryStorageBackend::new();

        let meta = backend
            .put("posts/a/meta.json", b"{}", Some("application/json"))
            .await
            .unwrap();
        assert_eq!(meta.key, "posts/a/meta.json");
        assert_eq!(meta.size, 2);

        let (data, meta) = backend.get("posts/a/meta.json").await.unwrap().unwrap();
        assert_eq!(data, b"{}");
        assert_eq!(meta.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryStorageBackend::new();
        assert!(backend.get("posts/missing/meta.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryStorageBackend::new();
        backend.put("posts/a/image-1.png", b"png", None).await.unwrap();

        assert!(backend.delete("posts/a/image-1.png").await.unwrap());
        assert!(!backend.delete("posts/a/image-1.png").await.unwrap());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_prefix_is_sorted() {
        let backend = MemoryStorageBackend::new();
        backend.put("posts/b/meta.json", b"{}", None).await.unwrap();
        backend.put("posts/a/meta.json", b"{}", None).await.unwrap();
        backend.put("posts/a/image-1.png", b"png", None).await.unwrap();
        backend.put("other/file.txt", b"x", None).await.unwrap();

        let all = backend.list(None).await.unwrap();
        assert_eq!(all.len(), 4);

        let keys: Vec<_> = backend
            .list(Some("posts/a/"))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["posts/a/image-1.png", "posts/a/meta.json"]);
    }

    #[tokio::test]
    async fn test_prefix_does_not_match_sibling_ids() {
        let backend = MemoryStorageBackend::new();
        backend.put("posts/a/meta.json", b"{}", None).await.unwrap();
        backend.put("posts/ab/meta.json", b"{}", None).await.unwrap();

        assert_eq!(backend.list(Some("posts/a/")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_content_type_guessed_from_extension() {
        let backend = MemoryStorageBackend::new();
        backend.put("posts/a/meta.json", b"{}", None).await.unwrap();
        backend.put("posts/a/image-1.png", b"png", None).await.unwrap();

        let json = backend.head("posts/a/meta.json").await.unwrap().unwrap();
        assert_eq!(json.content_type, "application/json");
        let png = backend.head("posts/a/image-1.png").await.unwrap().unwrap();
        assert_eq!(png.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_overwrite_keeps_created_at() {
        let backend = MemoryStorageBackend::new();
        let first = backend.put("posts/a/meta.json", b"{}", None).await.unwrap();
        let second = backend
            .put("posts/a/meta.json", b"{\"x\":1}", None)
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(backend.len(), 1);
        let (data, _) = backend.get("posts/a/meta.json").await.unwrap().unwrap();
        assert_eq!(data, b"{\"x\":1}");
    }

    #[tokio::test]
    async fn test_path_traversal_prevention() {
        let backend = MemoryStorageBackend::new();
        for key in ["../etc/passwd", "/etc/passwd", "posts/../../x"] {
            assert!(backend.put(key, b"x", None).await.is_err(), "accepted {key}");
        }
    }
}
