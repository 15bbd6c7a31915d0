//! Post entity and creation input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A staged post, stored as `posts/{id}/meta.json`.
///
/// The JSON form uses camelCase keys and RFC 3339 timestamps; `completedAt`
/// is omitted until the post has been completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Image URLs in placeholder order.
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Encodes the post as its metadata object.
    ///
    /// # Errors
    ///
    /// Returns a storage error if serialization fails.
    pub fn to_metadata(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self)
            .map_err(|e| Error::storage(format!("encoding metadata for post {}", self.id), e))
    }

    /// Parses a metadata object.
    ///
    /// # Errors
    ///
    /// Returns a storage error naming `key` if the bytes are not a valid post.
    pub fn from_metadata(key: &str, bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::storage(format!("parsing {key}"), e))
    }
}

/// One raw image in a create request.
///
/// Accepts either a bare string or an object with a `data` field; the string
/// is base64, optionally wrapped in a `data:image/<type>;base64,` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImagePayload {
    Inline(String),
    Wrapped { data: String },
}

impl ImagePayload {
    /// The encoded image data.
    pub fn data(&self) -> &str {
        match self {
            Self::Inline(data) | Self::Wrapped { data } => data,
        }
    }
}

impl From<&str> for ImagePayload {
    fn from(data: &str) -> Self {
        Self::Inline(data.to_string())
    }
}

/// Input to [`PostRepository::create`](super::PostRepository::create).
///
/// Either `id` or `topic_id` must be set. When `image_urls` is non-empty the
/// references are stored as-is and `images` is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPost {
    pub id: Option<String>,
    pub topic_id: Option<String>,
    pub title: String,
    pub body: String,
    pub hashtags: Vec<String>,
    pub images: Vec<ImagePayload>,
    pub image_urls: Vec<String>,
}

impl NewPost {
    /// Starts a post for `topic_id` with a generated id.
    pub fn for_topic(topic_id: &str, title: &str, body: &str) -> Self {
        Self {
            topic_id: Some(topic_id.to_string()),
            title: title.to_string(),
            body: body.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn with_hashtags<I, S>(mut self, hashtags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashtags = hashtags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_image_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_images<I>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = ImagePayload>,
    {
        self.images = images.into_iter().collect();
        self
    }
}

/// Result of listing every post: the posts that could be read, plus the
/// metadata objects that could not.
#[derive(Debug, Default)]
pub struct PostListing {
    pub posts: Vec<Post>,
    pub failures: Vec<ListFailure>,
}

impl PostListing {
    /// Sorts posts newest-first by creation time.
    pub fn sort_newest_first(&mut self) {
        self.posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

/// A metadata object that could not be fetched or parsed.
#[derive(Debug)]
pub struct ListFailure {
    pub key: String,
    pub error: Error,
}
