//! Wiring from configuration to a running [`LifecycleManager`], and to
//! [`PostAccess`] for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::clock::SystemClock;
use crate::config::{Config, StorageBackendKind};
use crate::lifecycle::LifecycleManager;
use crate::post::{Post, PostRepository};
use crate::storage::ObjectStore;

/// Opens the configured object store.
///
/// # Errors
///
/// Returns an error if the filesystem backend has no path or cannot be
/// opened.
pub fn open_store(config: &Config) -> Result<ObjectStore> {
    let base_url = config.base_url();
    match config.storage.backend {
        StorageBackendKind::Memory => {
            info!("Using in-memory storage; posts are lost on restart");
            Ok(ObjectStore::memory(&base_url))
        },
        StorageBackendKind::Filesystem => {
            let path = config
                .storage
                .path
                .as_deref()
                .context("storage.path is required for the filesystem backend")?;
            debug!(path = %path.display(), "Opening filesystem storage");
            ObjectStore::filesystem(path, &base_url)
                .with_context(|| format!("Failed to open storage at {}", path.display()))
        },
    }
}

/// Opens the store and builds a lifecycle manager on the system clock.
///
/// # Errors
///
/// See [`open_store`].
pub fn open_lifecycle(config: &Config) -> Result<LifecycleManager> {
    let store = open_store(config)?;
    let repo = PostRepository::new(store, Arc::new(SystemClock));
    Ok(LifecycleManager::new(repo))
}

/// Where CLI post commands are carried out.
#[derive(Debug)]
pub enum PostAccess {
    /// Through the API of a running server, which owns the store.
    Server(ApiClient),
    /// Directly against the store; no server answered.
    Store(LifecycleManager),
}

/// Outcome of a sweep run from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub deleted: usize,
    pub failed: usize,
}

/// Picks how CLI commands reach the posts: the running server if one
/// answers at [`Config::api_url`], otherwise the store itself.
///
/// # Errors
///
/// Returns an error if no server is running and the memory backend is
/// configured (there is nothing to open), or if the store cannot be opened.
pub async fn connect(config: &Config) -> Result<PostAccess> {
    let client = ApiClient::new(&config.api_url(), config.sweep.secret())?;
    if client.is_up().await {
        debug!(url = client.base_url(), "Using running server");
        return Ok(PostAccess::Server(client));
    }

    if config.storage.backend == StorageBackendKind::Memory {
        bail!(
            "No server is running at {} and the memory backend keeps posts only inside \
             `poststage serve`; start the server first",
            config.api_url()
        );
    }

    let lifecycle = open_lifecycle(config).with_context(|| {
        format!(
            "No server answered at {}; if `poststage serve` is running, check server.host and \
             server.port",
            config.api_url()
        )
    })?;
    Ok(PostAccess::Store(lifecycle))
}

impl PostAccess {
    /// Every readable post, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list(&self) -> Result<Vec<Post>> {
        match self {
            Self::Server(client) => client.list().await,
            Self::Store(lifecycle) => {
                let mut listing = lifecycle.repository().list_all().await?;
                for failure in &listing.failures {
                    warn!(key = %failure.key, error = %failure.error, "Skipped unreadable post");
                }
                listing.sort_newest_first();
                Ok(listing.posts)
            },
        }
    }

    /// # Errors
    ///
    /// Returns an error if the post does not exist or cannot be read.
    pub async fn get(&self, id: &str) -> Result<Post> {
        match self {
            Self::Server(client) => client.get(id).await,
            Self::Store(lifecycle) => Ok(lifecycle.repository().get_by_id(id).await?),
        }
    }

    /// Completes a post and returns its new deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist or cannot be updated.
    pub async fn complete(&self, id: &str) -> Result<DateTime<Utc>> {
        match self {
            Self::Server(client) => client.complete(id).await,
            Self::Store(lifecycle) => Ok(lifecycle.complete(id).await?),
        }
    }

    /// Deletes a post and returns how many objects went with it.
    ///
    /// # Errors
    ///
    /// Returns an error if a delete fails.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        match self {
            Self::Server(client) => client.delete(id).await,
            Self::Store(lifecycle) => Ok(lifecycle.repository().delete_all(id).await?),
        }
    }

    /// Deletes every expired post now.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep cannot start (listing fails, or the
    /// server rejects the secret).
    pub async fn sweep(&self) -> Result<SweepSummary> {
        match self {
            Self::Server(client) => {
                let response = client.cleanup().await?;
                Ok(SweepSummary {
                    deleted: response.deleted_count,
                    failed: response.failed_count,
                })
            },
            Self::Store(lifecycle) => {
                let report = lifecycle.sweep().await?;
                for failure in &report.failures {
                    warn!(%failure, "Sweep item failed");
                }
                Ok(SweepSummary {
                    deleted: report.deleted,
                    failed: report.failures.len(),
                })
            },
        }
    }

    /// Current time for deriving post state. The local clock when going
    /// through the server.
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::Server(_) => Utc::now(),
            Self::Store(lifecycle) => lifecycle.now(),
        }
    }
}
