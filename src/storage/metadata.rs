//! Metadata database operations for the filesystem backend.
//!
//! Object metadata (content type, timestamps) lives in a redb table keyed by
//! object key. Reconciliation brings the table back in line with the files
//! on disk after a crash or manual edits.

use anyhow::{Context, Result};
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::types::{OBJECTS_TABLE, ObjectMeta, resolve_content_type};
use super::validation::is_reserved;

/// Saves object metadata to the database.
pub(crate) fn save_metadata(db: &Database, meta: &ObjectMeta) -> Result<()> {
    let write_txn = db
        .begin_write()
        .context("Failed to begin write transaction")?;

    {
        let mut table = write_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to open objects table")?;

        let json = serde_json::to_vec(meta).context("Failed to serialize object metadata")?;

        table
            .insert(meta.key.as_str(), json.as_slice())
            .with_context(|| format!("Failed to insert object metadata: {}", meta.key))?;
    }

    write_txn
        .commit()
        .context("Failed to commit metadata save transaction")?;

    Ok(())
}

/// Loads object metadata from the database.
pub(crate) fn load_metadata(db: &Database, key: &str) -> Result<Option<ObjectMeta>> {
    let read_txn = db
        .begin_read()
        .context("Failed to begin read transaction")?;

    let table = read_txn
        .open_table(OBJECTS_TABLE)
        .context("Failed to open objects table")?;

    let result = table
        .get(key)
        .with_context(|| format!("Failed to read object metadata: {key}"))?;

    match result {
        Some(guard) => {
            let meta = serde_json::from_slice(guard.value())
                .with_context(|| format!("Failed to deserialize object metadata: {key}"))?;
            Ok(Some(meta))
        },
        None => Ok(None),
    }
}

/// Removes object metadata from the database.
pub(crate) fn remove_metadata(db: &Database, key: &str) -> Result<()> {
    let write_txn = db
        .begin_write()
        .context("Failed to begin write transaction")?;

    {
        let mut table = write_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to open objects table")?;

        table
            .remove(key)
            .with_context(|| format!("Failed to remove object metadata: {key}"))?;
    }

    write_txn
        .commit()
        .context("Failed to commit metadata removal transaction")?;

    Ok(())
}

/// Lists metadata entries whose key starts with `prefix`, sorted by key.
pub(crate) fn list_metadata(db: &Database, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
    let read_txn = db
        .begin_read()
        .context("Failed to begin read transaction")?;

    let table = read_txn
        .open_table(OBJECTS_TABLE)
        .context("Failed to open objects table")?;

    let mut objects = Vec::new();

    for item in table.iter().context("Failed to iterate objects table")? {
        let (key, value) = item.context("Failed to read object entry")?;

        if let Some(prefix) = prefix
            && !key.value().starts_with(prefix)
        {
            continue;
        }

        match serde_json::from_slice::<ObjectMeta>(value.value()) {
            Ok(meta) => objects.push(meta),
            Err(e) => tracing::warn!(key = key.value(), error = %e, "Skipping unreadable object metadata"),
        }
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(objects)
}

/// Reconciles the metadata table with the files under `base_dir`.
///
/// - Entries whose file is gone are removed.
/// - Files without an entry get one.
/// - Entries whose recorded size differs from the file are refreshed.
///
/// Called once when the backend is opened.
pub(crate) fn reconcile(db: &Database, base_dir: &Path) -> Result<()> {
    tracing::debug!(base_dir = %base_dir.display(), "Reconciling storage metadata");

    let mut fs_files: HashSet<String> = HashSet::new();
    scan_directory(base_dir, base_dir, &mut fs_files)?;

    let mut orphaned: Vec<String> = Vec::new();
    let mut stale: Vec<(String, u64)> = Vec::new();

    {
        let read_txn = db
            .begin_read()
            .context("Failed to begin read transaction for reconciliation")?;
        let table = read_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to open objects table for reconciliation")?;

        for item in table.iter().context("Failed to iterate objects table")? {
            let (key, value) = item.context("Failed to read object entry")?;
            let key = key.value().to_string();

            if fs_files.remove(&key) {
                if let Ok(meta) = serde_json::from_slice::<ObjectMeta>(value.value())
                    && let Ok(file_meta) = fs::metadata(base_dir.join(&key))
                    && file_meta.len() != meta.size
                {
                    stale.push((key, file_meta.len()));
                }
            } else {
                orphaned.push(key);
            }
        }
    }

    for key in &orphaned {
        remove_metadata(db, key)?;
    }

    for key in &fs_files {
        if let Ok(file_meta) = fs::metadata(base_dir.join(key)) {
            let now = Utc::now();
            let meta = ObjectMeta {
                key: key.clone(),
                size: file_meta.len(),
                content_type: resolve_content_type(key, None),
                created_at: now,
                modified_at: now,
            };
            save_metadata(db, &meta)?;
        }
    }

    for (key, actual_size) in &stale {
        if let Some(mut meta) = load_metadata(db, key)? {
            meta.size = *actual_size;
            meta.modified_at = Utc::now();
            save_metadata(db, &meta)?;
        }
    }

    let total_fixes = orphaned.len() + fs_files.len() + stale.len();
    if total_fixes > 0 {
        tracing::info!(
            orphaned = orphaned.len(),
            untracked = fs_files.len(),
            stale = stale.len(),
            "Storage reconciliation complete"
        );
    } else {
        tracing::debug!("Storage metadata is consistent with filesystem");
    }

    Ok(())
}

/// Recursively collects object keys (paths relative to `base_dir`).
fn scan_directory(base_dir: &Path, dir: &Path, files: &mut HashSet<String>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if is_reserved(&path) {
            continue;
        }

        if path.is_dir() {
            scan_directory(base_dir, &path, files)?;
        } else if path.is_file()
            && let Ok(relative) = path.strip_prefix(base_dir)
        {
            files.insert(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    Ok(())
}
