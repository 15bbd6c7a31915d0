//! Key validation for the object store.
//!
//! Keys are slash-separated relative paths. The filesystem backend maps them
//! directly onto disk, so anything that could escape the storage directory
//! is rejected for every backend.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

use super::types::METADATA_DB_FILE;

/// Whether `path` names one of the backend's own files (the metadata
/// database or a lock file). These are never objects.
pub(crate) fn is_reserved(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == METADATA_DB_FILE)
        || path.extension().is_some_and(|e| e == "lock")
}

/// Validates a key and returns its normalized form (forward slashes, no
/// `.` components).
///
/// ```text
/// validate_key("posts/a/meta.json")    // Ok("posts/a/meta.json")
/// validate_key("./posts/a/meta.json")  // Ok("posts/a/meta.json")
/// validate_key("../etc/passwd")        // Err: traversal
/// validate_key("/etc/passwd")          // Err: absolute
/// validate_key("")                     // Err: empty
/// validate_key("metadata.redb")        // Err: reserved
/// ```
pub(crate) fn validate_key(key: &str) -> Result<String> {
    if key.is_empty() {
        bail!("Object key cannot be empty");
    }

    let path = Path::new(key);

    if path.is_absolute() || key.starts_with('/') {
        bail!("Object key cannot be absolute: {key}");
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => normalized.push(name),
            Component::CurDir => {},
            Component::ParentDir => bail!("Object key cannot contain '..': {key}"),
            Component::RootDir | Component::Prefix(_) => {
                bail!("Object key cannot contain root or prefix: {key}")
            },
        }
    }

    if normalized.as_os_str().is_empty() {
        bail!("Object key normalized to empty path: {key}");
    }

    if is_reserved(&normalized) {
        bail!("Object key names a reserved storage file: {key}");
    }

    Ok(normalized.to_string_lossy().replace('\\', "/"))
}

/// Returns the filesystem path for a key under `base_dir`.
pub(crate) fn object_path(base_dir: &Path, key: &str) -> Result<PathBuf> {
    let normalized = validate_key(key)?;
    Ok(base_dir.join(normalized))
}
