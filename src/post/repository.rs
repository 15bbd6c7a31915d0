//! Post repository over the object store.
//!
//! Each post owns the key prefix `posts/{id}/`:
//!
//! ```text
//! posts/{id}/meta.json        JSON-encoded Post
//! posts/{id}/image-1.png      raw image bytes, 1-based
//! posts/{id}/image-2.jpg
//! ```
//!
//! Deleting a post means deleting everything under its prefix. Multi-object
//! writes are not atomic: a failed create can leave images without metadata.
//! Image keys are deterministic, so retrying the same create overwrites them
//! instead of piling up copies.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::id::{generate_id, validate_segment};
use super::image::{decode_image, image_key};
use super::model::{ListFailure, NewPost, Post, PostListing};
use crate::clock::Clock;
use crate::constants::{INITIAL_TTL, LIST_CONCURRENCY, META_FILE, POSTS_PREFIX};
use crate::error::{Error, Result, StorageContext};
use crate::storage::ObjectStore;

/// An image stored ahead of post creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub index: usize,
}

/// Maps posts onto metadata and image objects.
///
/// Holds no state beyond its handles; every read goes to the store.
#[derive(Clone)]
pub struct PostRepository {
    store: ObjectStore,
    clock: Arc<dyn Clock>,
}

impl PostRepository {
    pub fn new(store: ObjectStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying object store.
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// The clock used for creation timestamps.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Key prefix shared by all of a post's objects.
    pub fn prefix(id: &str) -> String {
        format!("{POSTS_PREFIX}{id}/")
    }

    /// Key of a post's metadata object.
    pub fn meta_key(id: &str) -> String {
        format!("{POSTS_PREFIX}{id}/{META_FILE}")
    }

    /// Creates a post, storing any inline images first and the metadata last.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the title, body, or both id and topic are
    ///   missing, an image payload is invalid, or a post with the same id
    ///   already exists.
    /// - [`Error::Storage`] if a write fails. Images written before the
    ///   failure are left in place.
    pub async fn create(&self, new_post: NewPost) -> Result<Post> {
        if new_post.title.trim().is_empty() {
            return Err(Error::validation("title is required"));
        }
        if new_post.body.trim().is_empty() {
            return Err(Error::validation("body is required"));
        }

        let now = self.clock.now();
        let id = match (&new_post.id, &new_post.topic_id) {
            (Some(id), _) if !id.is_empty() => id.clone(),
            (_, Some(topic)) => {
                validate_segment("topicId", topic)?;
                generate_id(topic, now)
            },
            _ => return Err(Error::validation("topicId is required when id is absent")),
        };
        validate_segment("id", &id)?;

        let meta_key = Self::meta_key(&id);
        let exists = self
            .store
            .exists(&meta_key)
            .await
            .storage_context(|| format!("checking {meta_key}"))?;
        if exists {
            return Err(Error::validation(format!("post '{id}' already exists")));
        }

        let images = if new_post.image_urls.is_empty() {
            self.store_images(&id, &new_post).await?
        } else {
            if !new_post.images.is_empty() {
                debug!(post_id = %id, "Using pre-uploaded image URLs; ignoring inline images");
            }
            new_post.image_urls
        };

        let post = Post {
            id,
            title: new_post.title,
            body: new_post.body,
            hashtags: new_post.hashtags,
            images,
            created_at: now,
            expires_at: now + INITIAL_TTL,
            completed_at: None,
        };

        self.write_metadata(&post).await?;

        info!(
            post_id = %post.id,
            images = post.images.len(),
            expires_at = %post.expires_at,
            "Post created"
        );

        Ok(post)
    }

    async fn store_images(&self, id: &str, new_post: &NewPost) -> Result<Vec<String>> {
        // Decode everything up front so a bad payload fails before any write.
        let decoded = new_post
            .images
            .iter()
            .map(|payload| decode_image(payload.data()))
            .collect::<Result<Vec<_>>>()?;

        let prefix = Self::prefix(id);
        let mut urls = Vec::with_capacity(decoded.len());
        for (i, image) in decoded.iter().enumerate() {
            let key = image_key(&prefix, i + 1, image.extension);
            let stored = self
                .store
                .put(&key, &image.bytes, image.content_type)
                .await
                .storage_context(|| format!("writing {key}"))?;
            urls.push(stored.url);
        }
        Ok(urls)
    }

    /// Stores a single image for a post that has not been created yet.
    ///
    /// The image lands at `posts/{post_id}/image-{index + 1}.{ext}`, the same
    /// key inline images use, so the returned URL can be passed back as an
    /// image reference on create.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad id or payload, a storage error if
    /// the write fails.
    pub async fn upload_image(&self, post_id: &str, index: usize, data: &str) -> Result<UploadedImage> {
        validate_segment("postId", post_id)?;
        let image = decode_image(data)?;
        let key = image_key(&Self::prefix(post_id), index + 1, image.extension);

        let stored = self
            .store
            .put(&key, &image.bytes, image.content_type)
            .await
            .storage_context(|| format!("writing {key}"))?;

        debug!(post_id, index, key = %key, "Image uploaded");

        Ok(UploadedImage {
            url: stored.url,
            index,
        })
    }

    /// Reads a post.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no metadata object exists under the post's
    /// prefix, [`Error::Storage`] if listing, reading, or parsing fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Post> {
        if validate_segment("id", id).is_err() {
            return Err(Error::not_found(id));
        }

        let prefix = Self::prefix(id);
        let objects = self
            .store
            .list(&prefix)
            .await
            .storage_context(|| format!("listing {prefix}"))?;

        let meta_suffix = format!("/{META_FILE}");
        let meta = objects
            .iter()
            .find(|obj| obj.key.ends_with(&meta_suffix))
            .ok_or_else(|| Error::not_found(id))?;

        self.read_metadata(&meta.key)
            .await?
            .ok_or_else(|| Error::not_found(id))
    }

    /// Lists every post. Order is arbitrary.
    ///
    /// A metadata object that cannot be read or parsed is reported in
    /// [`PostListing::failures`] and does not affect the other posts.
    ///
    /// # Errors
    ///
    /// Returns a storage error only if the listing itself fails.
    pub async fn list_all(&self) -> Result<PostListing> {
        let objects = self
            .store
            .list(POSTS_PREFIX)
            .await
            .storage_context(|| format!("listing {POSTS_PREFIX}"))?;

        let meta_suffix = format!("/{META_FILE}");
        let keys: Vec<String> = objects
            .into_iter()
            .filter(|obj| obj.key.ends_with(&meta_suffix))
            .map(|obj| obj.key)
            .collect();

        let results: Vec<(String, Result<Option<Post>>)> = stream::iter(keys)
            .map(|key| async move {
                let result = self.read_metadata(&key).await;
                (key, result)
            })
            .buffer_unordered(LIST_CONCURRENCY)
            .collect()
            .await;

        let mut listing = PostListing::default();
        for (key, result) in results {
            match result {
                Ok(Some(post)) => listing.posts.push(post),
                // Deleted between list and read.
                Ok(None) => debug!(key = %key, "Metadata vanished during listing"),
                Err(error) => {
                    warn!(key = %key, error = %error, "Skipping unreadable post metadata");
                    listing.failures.push(ListFailure { key, error });
                },
            }
        }

        Ok(listing)
    }

    /// Deletes every object under the post's prefix and returns how many
    /// were deleted. A missing post yields `Ok(0)`.
    ///
    /// # Errors
    ///
    /// Returns a storage error on the first failed list or delete call;
    /// objects deleted before it stay deleted.
    pub async fn delete_all(&self, id: &str) -> Result<usize> {
        if validate_segment("id", id).is_err() {
            return Ok(0);
        }

        let prefix = Self::prefix(id);
        let objects = self
            .store
            .list(&prefix)
            .await
            .storage_context(|| format!("listing {prefix}"))?;

        let mut deleted = 0;
        for obj in &objects {
            let removed = self
                .store
                .delete(&obj.key)
                .await
                .storage_context(|| format!("deleting {}", obj.key))?;
            if removed {
                deleted += 1;
            }
        }

        if deleted > 0 {
            info!(post_id = id, deleted, "Post deleted");
        }

        Ok(deleted)
    }

    /// Rewrites a post's metadata with a new expiry and completion time.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the post does not exist, [`Error::Storage`] if
    /// the read or write fails.
    pub async fn update_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Post> {
        let mut post = self.get_by_id(id).await?;
        post.expires_at = expires_at;
        post.completed_at = completed_at;
        self.write_metadata(&post).await?;
        Ok(post)
    }

    async fn read_metadata(&self, key: &str) -> Result<Option<Post>> {
        let bytes = self
            .store
            .get(key)
            .await
            .storage_context(|| format!("reading {key}"))?;

        bytes.map(|bytes| Post::from_metadata(key, &bytes)).transpose()
    }

    async fn write_metadata(&self, post: &Post) -> Result<()> {
        let key = Self::meta_key(&post.id);
        let bytes = post.to_metadata()?;
        self.store
            .put(&key, &bytes, "application/json")
            .await
            .storage_context(|| format!("writing {key}"))?;
        Ok(())
    }
}

impl std::fmt::Debug for PostRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostRepository")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
