//! CLI command implementations.
//!
//! - [`serve`] - HTTP server with the sweep schedule
//! - [`sweep`] - One-off sweep of expired posts
//! - [`posts`] - Inspect and manage individual posts

pub mod posts;
pub mod serve;
pub mod sweep;
