//! Error types for post storage and lifecycle operations.
//!
//! Storage backends work with `anyhow`; the repository converts backend
//! failures into [`Error::Storage`] at its boundary so callers get a small,
//! matchable taxonomy.

/// Result type for post operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the repository and lifecycle manager.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing or malformed input. User-correctable.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The post has no metadata object.
    #[error("post not found: {id}")]
    NotFound { id: String },

    /// An object store call failed or returned unreadable data.
    #[error("storage error while {context}: {source:#}")]
    Storage {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a storage error with context.
    pub fn storage(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Storage { .. } => 500,
        }
    }
}

/// Attach storage context to backend results.
pub(crate) trait StorageContext<T> {
    fn storage_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> StorageContext<T> for anyhow::Result<T> {
    fn storage_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::storage(context(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("title is required").status_code(), 400);
        assert_eq!(Error::not_found("abc").status_code(), 404);
        assert_eq!(
            Error::storage("writing metadata", anyhow::anyhow!("disk full")).status_code(),
            500
        );
    }

    #[test]
    fn test_storage_message_includes_context_and_cause() {
        let err = Error::storage("deleting posts/a/meta.json", anyhow::anyhow!("permission denied"));
        let msg = err.to_string();
        assert!(msg.contains("deleting posts/a/meta.json"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_storage_context_maps_anyhow() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("boom"));
        let err = result.storage_context(|| "listing posts/").unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
