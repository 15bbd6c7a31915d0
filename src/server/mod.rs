//! HTTP API.
//!
//! | Method     | Path                       | Purpose                          |
//! |------------|----------------------------|----------------------------------|
//! | POST       | `/api/posts`               | Create a post                    |
//! | GET        | `/api/posts`               | List posts, newest first         |
//! | GET        | `/api/posts/{id}`          | Read one post                    |
//! | DELETE     | `/api/posts/{id}`          | Delete a post and its images     |
//! | POST       | `/api/posts/{id}/complete` | Extend expiry after publishing   |
//! | POST       | `/api/upload-image`        | Store one image for a post       |
//! | GET, POST  | `/api/cleanup`             | Sweep expired posts (bearer)     |
//! | GET        | `/post/{id}`               | HTML preview page                |
//! | GET        | `/blobs/{*key}`            | Raw stored object                |
//! | GET        | `/health`                  | Liveness                         |

mod audit;
mod auth;
mod error;
mod handlers;
pub mod types;

pub use error::AppError;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::REQUEST_TIMEOUT_SECS;
use crate::lifecycle::LifecycleManager;
use crate::post::PostRepository;
use crate::render::RenderOptions;
use crate::scheduler::SweepScheduler;

/// State shared by every handler.
pub struct AppState {
    pub lifecycle: LifecycleManager,
    /// Public base URL without a trailing slash.
    pub base_url: String,
    /// Bearer secret for `/api/cleanup`. `None` keeps the trigger closed.
    pub sweep_secret: Option<String>,
    pub render: RenderOptions,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(lifecycle: LifecycleManager, base_url: &str) -> Self {
        Self {
            lifecycle,
            base_url: base_url.trim_end_matches('/').to_string(),
            sweep_secret: None,
            render: RenderOptions::default(),
        }
    }

    #[must_use]
    pub fn with_sweep_secret(mut self, secret: Option<String>) -> Self {
        self.sweep_secret = secret;
        self
    }

    #[must_use]
    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn repository(&self) -> &PostRepository {
        self.lifecycle.repository()
    }

    /// Preview page URL for a post.
    pub fn post_url(&self, id: &str) -> String {
        format!("{}/post/{id}", self.base_url)
    }
}

/// Builds the router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/api/posts",
            post(handlers::create_post).get(handlers::list_posts),
        )
        .route(
            "/api/posts/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route("/api/posts/{id}/complete", post(handlers::complete_post))
        .route("/api/upload-image", post(handlers::upload_image))
        .route(
            "/api/cleanup",
            post(handlers::cleanup).get(handlers::cleanup),
        )
        .route("/post/{id}", get(handlers::preview_page))
        .route("/blobs/{*key}", get(handlers::get_blob))
        .route("/health", get(handlers::health))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Runs the server until Ctrl+C, with the sweep schedule if enabled.
///
/// # Errors
///
/// Returns an error if storage cannot be opened, the schedule is invalid, or
/// the listener cannot bind.
pub async fn serve(config: &Config) -> Result<()> {
    let lifecycle = crate::app::open_lifecycle(config)?;

    let sweep_secret = config.sweep.secret();
    if sweep_secret.is_none() {
        warn!(
            env = %config.sweep.secret_env,
            "Sweep secret not set, /api/cleanup will reject every request"
        );
    }

    let scheduler = if config.sweep.enabled {
        Some(SweepScheduler::start(lifecycle.clone(), &config.sweep.schedule).await?)
    } else {
        None
    };

    let state = AppState::new(lifecycle, &config.base_url())
        .with_sweep_secret(sweep_secret)
        .with_render(config.render.options());
    let app = router(Arc::new(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(%addr, base_url = %config.base_url(), "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
