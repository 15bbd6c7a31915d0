//! Post lifecycle: active, completed, expired.
//!
//! State is derived from timestamps rather than stored:
//!
//! ```text
//!   create ──► Active ──complete──► Completed ──┐
//!                 │        ▲            │       │ complete (again)
//!                 │        └────────────┼───────┘
//!                 └── expires_at < now ─┴──► Expired ──sweep──► deleted
//! ```
//!
//! `complete` resets the deadline to five days from the moment it is called,
//! every time it is called. A post past its deadline is `Expired` regardless
//! of whether it was completed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::constants::COMPLETED_TTL;
use crate::error::{Error, Result};
use crate::post::{Post, PostRepository};

/// Derived lifecycle state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostState {
    Active,
    Completed,
    Expired,
}

impl std::fmt::Display for PostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Whether `post` is past its deadline at `now`.
///
/// Strict: a post whose `expires_at` equals `now` is not yet expired.
pub fn is_expired(post: &Post, now: DateTime<Utc>) -> bool {
    post.expires_at < now
}

/// Lifecycle state of `post` at `now`.
pub fn state_at(post: &Post, now: DateTime<Utc>) -> PostState {
    if is_expired(post, now) {
        PostState::Expired
    } else if post.completed_at.is_some() {
        PostState::Completed
    } else {
        PostState::Active
    }
}

/// Outcome of a sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Posts whose objects this sweep deleted.
    pub deleted: usize,
    /// Objects deleted across those posts.
    pub blobs_deleted: usize,
    /// Expired posts seen.
    pub expired: usize,
    /// Items that could not be read or deleted.
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single item a sweep could not process.
#[derive(Debug)]
pub enum SweepFailure {
    /// The metadata object could not be read or parsed.
    Unreadable { key: String, error: Error },
    /// The post is expired but deleting its objects failed.
    DeleteFailed { id: String, error: Error },
}

impl std::fmt::Display for SweepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { key, error } => write!(f, "{key}: {error}"),
            Self::DeleteFailed { id, error } => write!(f, "post {id}: {error}"),
        }
    }
}

/// Applies lifecycle transitions through a [`PostRepository`].
#[derive(Clone)]
pub struct LifecycleManager {
    repo: PostRepository,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    /// Uses the repository's clock.
    pub fn new(repo: PostRepository) -> Self {
        let clock = Arc::clone(repo.clock());
        Self { repo, clock }
    }

    pub fn repository(&self) -> &PostRepository {
        &self.repo
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Marks a post completed and pushes its deadline to now + 5 days.
    ///
    /// Calling it again extends the deadline again from the new "now".
    /// Concurrent calls race; the last metadata write wins.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the post does not exist, [`Error::Storage`] if
    /// the metadata cannot be read or rewritten.
    pub async fn complete(&self, id: &str) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        let expires_at = now + COMPLETED_TTL;
        self.repo.update_expiry(id, expires_at, Some(now)).await?;

        info!(post_id = id, expires_at = %expires_at, "Post completed");

        Ok(expires_at)
    }

    /// See [`is_expired`].
    pub fn is_expired(&self, post: &Post, now: DateTime<Utc>) -> bool {
        is_expired(post, now)
    }

    /// Lifecycle state of `post` at the clock's current time.
    pub fn state(&self, post: &Post) -> PostState {
        state_at(post, self.clock.now())
    }

    /// Deletes every post that is expired at `now`.
    ///
    /// Each post is handled on its own: an unreadable metadata object or a
    /// failed delete is recorded in the report and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Returns a storage error only if the initial listing fails.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let listing = self.repo.list_all().await?;

        let mut report = SweepReport {
            failures: listing
                .failures
                .into_iter()
                .map(|f| SweepFailure::Unreadable {
                    key: f.key,
                    error: f.error,
                })
                .collect(),
            ..SweepReport::default()
        };

        for post in listing.posts.iter().filter(|post| is_expired(post, now)) {
            report.expired += 1;
            match self.repo.delete_all(&post.id).await {
                // Zero means another sweep or a DELETE got there first.
                Ok(0) => debug!(post_id = %post.id, "Expired post already gone"),
                Ok(blobs) => {
                    report.deleted += 1;
                    report.blobs_deleted += blobs;
                },
                Err(error) => {
                    warn!(post_id = %post.id, error = %error, "Failed to delete expired post");
                    report.failures.push(SweepFailure::DeleteFailed {
                        id: post.id.clone(),
                        error,
                    });
                },
            }
        }

        info!(
            scanned = listing.posts.len(),
            expired = report.expired,
            deleted = report.deleted,
            blobs_deleted = report.blobs_deleted,
            failures = report.failures.len(),
            "Sweep finished"
        );

        Ok(report)
    }

    /// Sweeps at the clock's current time.
    ///
    /// # Errors
    ///
    /// See [`sweep_expired`](Self::sweep_expired).
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_expired(self.clock.now()).await
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}
