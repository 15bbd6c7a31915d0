//! Filesystem-backed storage backend.
//!
//! Objects are plain files under a base directory; their metadata is kept in
//! a redb table next to them.

use super::backend::StorageBackend;
use super::metadata::{list_metadata, load_metadata, reconcile, remove_metadata, save_metadata};
use super::types::{METADATA_DB_FILE, OBJECTS_TABLE, ObjectMeta, resolve_content_type};
use super::validation::{object_path, validate_key};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use redb::Database;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem-backed object storage backend.
///
/// `FilesystemBackend` is `Clone`; clones share the metadata database.
#[derive(Clone)]
pub struct FilesystemBackend {
    base_dir: PathBuf,
    db: Arc<Database>,
}

impl FilesystemBackend {
    /// Creates or opens the backend rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The storage directory cannot be created
    /// - The metadata database cannot be opened or initialized
    /// - Metadata reconciliation fails
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir).with_context(|| {
            format!("Failed to create storage directory: {}", base_dir.display())
        })?;

        let db_path = base_dir.join(METADATA_DB_FILE);
        let db = Database::create(&db_path).with_context(|| {
            format!(
                "Failed to open storage metadata database: {}",
                db_path.display()
            )
        })?;

        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(OBJECTS_TABLE)
                .context("Failed to initialize objects table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        reconcile(&db, &base_dir)?;

        Ok(Self {
            base_dir,
            db: Arc::new(db),
        })
    }

    fn put_sync(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<ObjectMeta> {
        let key = validate_key(key)?;
        let file_path = self.base_dir.join(&key);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directories for: {key}"))?;
        }

        fs::write(&file_path, data).with_context(|| format!("Failed to write object: {key}"))?;

        let now = Utc::now();
        let created_at = load_metadata(&self.db, &key)?.map_or(now, |m| m.created_at);
        let meta = ObjectMeta {
            content_type: resolve_content_type(&key, content_type),
            key,
            size: data.len() as u64,
            created_at,
            modified_at: now,
        };

        save_metadata(&self.db, &meta)?;

        Ok(meta)
    }

    fn get_sync(&self, key: &str) -> Result<Option<(Vec<u8>, ObjectMeta)>> {
        let Some(meta) = self.head_sync(key)? else {
            return Ok(None);
        };

        let file_path = object_path(&self.base_dir, key)?;
        let data = fs::read(&file_path).with_context(|| format!("Failed to read object: {key}"))?;

        Ok(Some((data, meta)))
    }

    fn delete_sync(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        let file_path = self.base_dir.join(&key);

        if !file_path.exists() {
            remove_metadata(&self.db, &key)?;
            return Ok(false);
        }

        fs::remove_file(&file_path).with_context(|| format!("Failed to delete object: {key}"))?;
        remove_metadata(&self.db, &key)?;
        self.prune_empty_dirs(&file_path);

        Ok(true)
    }

    fn head_sync(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let key = validate_key(key)?;
        let file_path = self.base_dir.join(&key);

        if !file_path.is_file() {
            return Ok(None);
        }

        if let Some(meta) = load_metadata(&self.db, &key)? {
            return Ok(Some(meta));
        }

        // File exists without metadata; rebuild it from the filesystem.
        let metadata = fs::metadata(&file_path)
            .with_context(|| format!("Failed to get file metadata: {key}"))?;
        let now = Utc::now();
        Ok(Some(ObjectMeta {
            content_type: resolve_content_type(&key, None),
            key,
            size: metadata.len(),
            created_at: now,
            modified_at: now,
        }))
    }

    /// Removes now-empty parent directories up to (not including) the base.
    fn prune_empty_dirs(&self, file_path: &Path) {
        let mut dir = file_path.parent();
        while let Some(current) = dir {
            if current == self.base_dir || !current.starts_with(&self.base_dir) {
                break;
            }
            // remove_dir fails on non-empty directories, which ends the walk.
            if fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<ObjectMeta> {
        let backend = self.clone();
        let key = key.to_string();
        let data = data.to_vec();
        let content_type = content_type.map(std::string::ToString::to_string);
        tokio::task::spawn_blocking(move || backend.put_sync(&key, &data, content_type.as_deref()))
            .await
            .context("Task join error")?
    }

    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, ObjectMeta)>> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.get_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.delete_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.head_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let backend = self.clone();
        let prefix = prefix.map(std::string::ToString::to_string);
        tokio::task::spawn_blocking(move || list_metadata(&backend.db, prefix.as_deref()))
            .await
            .context("Task join error")?
    }
}
