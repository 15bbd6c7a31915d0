//! poststage - short-lived staging for blog posts.
//!
//! A post (title, body, hashtags, images) is stored as a JSON metadata object
//! plus image blobs under `posts/{id}/` in an object store. Posts expire seven
//! days after creation; completing a post resets the deadline to five days
//! from the moment of completion. A recurring sweep deletes expired posts.
//!
//! # Modules
//!
//! - [`storage`] - Object store backends (memory, filesystem) and the
//!   [`storage::ObjectStore`] facade
//! - [`post`] - The [`Post`] entity and the [`PostRepository`]
//! - [`lifecycle`] - Expiry state machine and sweeps
//! - [`clock`] - Injectable time source
//! - [`render`] - Paste-ready HTML preview rendering
//! - [`server`] - HTTP API
//! - [`scheduler`] - Recurring sweep job
//! - [`config`] - TOML configuration
//! - [`app`] - Wiring from configuration to storage and lifecycle
//! - [`client`] - HTTP client the CLI uses while a server is running

pub mod app;
pub mod client;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod post;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use lifecycle::{LifecycleManager, PostState, SweepFailure, SweepReport};
pub use post::{ImagePayload, NewPost, Post, PostListing, PostRepository};
