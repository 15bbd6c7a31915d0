//! Posts and their storage layout.

mod id;
mod image;
mod model;
mod repository;

pub use id::{generate_id, validate_segment};
pub use model::{ImagePayload, ListFailure, NewPost, Post, PostListing};
pub use repository::{PostRepository, UploadedImage};
