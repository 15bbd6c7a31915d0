//! Route handlers.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::warn;

use super::audit::{AuditEvent, log_audit_event};
use super::auth::check_bearer;
use super::error::AppError;
use super::types::{
    CleanupResponse, CompletePostResponse, CreatePostResponse, DeletePostResponse,
    HealthResponse, PostListResponse, PostResponse, UploadImageRequest, UploadImageResponse,
};
use super::SharedState;
use crate::constants::POSTS_PREFIX;
use crate::error::Error;
use crate::post::NewPost;
use crate::render::{not_found_page, render};
use crate::storage::is_valid_key;

/// POST /api/posts - Create a post.
pub(crate) async fn create_post(
    State(state): State<SharedState>,
    body: Result<Json<NewPost>, JsonRejection>,
) -> Result<Json<CreatePostResponse>, AppError> {
    let Json(new_post) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let post = state.repository().create(new_post).await?;

    Ok(Json(CreatePostResponse {
        success: true,
        url: state.post_url(&post.id),
        id: post.id,
        expires_at: post.expires_at,
    }))
}

/// GET /api/posts - List all posts, newest first.
pub(crate) async fn list_posts(
    State(state): State<SharedState>,
) -> Result<Json<PostListResponse>, AppError> {
    let mut listing = state.repository().list_all().await?;
    if !listing.failures.is_empty() {
        warn!(
            failures = listing.failures.len(),
            "Some posts could not be read and were left out of the listing"
        );
    }
    listing.sort_newest_first();
    Ok(Json(PostListResponse {
        posts: listing.posts,
    }))
}

/// GET /api/posts/{id} - Get one post.
pub(crate) async fn get_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let post = state.repository().get_by_id(&id).await?;
    Ok(Json(PostResponse { post }))
}

/// DELETE /api/posts/{id} - Delete all storage for a post.
pub(crate) async fn delete_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DeletePostResponse>, AppError> {
    let deleted = state.repository().delete_all(&id).await?;
    Ok(Json(DeletePostResponse {
        success: true,
        deleted,
    }))
}

/// POST /api/posts/{id}/complete - Extend a post's expiry.
pub(crate) async fn complete_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CompletePostResponse>, AppError> {
    let expires_at = state.lifecycle.complete(&id).await?;
    Ok(Json(CompletePostResponse {
        success: true,
        expires_at,
    }))
}

/// POST /api/upload-image - Store one image ahead of post creation.
pub(crate) async fn upload_image(
    State(state): State<SharedState>,
    body: Result<Json<UploadImageRequest>, JsonRejection>,
) -> Result<Json<UploadImageResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (Some(post_id), Some(index), Some(data)) = (req.post_id, req.image_index, req.image_data)
    else {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    };
    if data.is_empty() {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    }

    let uploaded = state
        .repository()
        .upload_image(&post_id, index, &data)
        .await?;

    Ok(Json(UploadImageResponse {
        success: true,
        url: uploaded.url,
        image_index: uploaded.index,
    }))
}

/// POST /api/cleanup - Sweep expired posts. Requires the bearer secret.
pub(crate) async fn cleanup(
    State(state): State<SharedState>,
    request: Request,
) -> Result<Json<CleanupResponse>, AppError> {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if let Err(rejection) = check_bearer(request.headers(), state.sweep_secret.as_deref()) {
        log_audit_event(AuditEvent::AuthFailure {
            remote_addr,
            reason: rejection.reason(),
        });
        return Err(AppError::Unauthorized);
    }
    log_audit_event(AuditEvent::AuthSuccess { remote_addr });

    let report = state.lifecycle.sweep().await?;

    Ok(Json(CleanupResponse {
        success: true,
        deleted_count: report.deleted,
        failed_count: report.failures.len(),
    }))
}

/// GET /post/{id} - Paste-ready preview page.
pub(crate) async fn preview_page(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    match state.repository().get_by_id(&id).await {
        Ok(post) => {
            let document = render(&post, state.lifecycle.now(), &state.render);
            Ok(Html(document.page_html).into_response())
        },
        Err(Error::NotFound { .. }) => {
            Ok((StatusCode::NOT_FOUND, Html(not_found_page())).into_response())
        },
        Err(e) => Err(e.into()),
    }
}

/// GET /blobs/{*key} - Serve a stored object. Only keys under `posts/` are
/// reachable.
pub(crate) async fn get_blob(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    if !key.starts_with(POSTS_PREFIX) || !is_valid_key(&key) {
        log_audit_event(AuditEvent::PathTraversalBlocked { path: key });
        return Err(AppError::NotFound("Object not found".to_string()));
    }

    let (data, meta) = state
        .repository()
        .store()
        .get_with_meta(&key)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read object: {e:#}")))?
        .ok_or_else(|| AppError::NotFound("Object not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, meta.content_type)], data).into_response())
}

/// GET /health - Liveness check.
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
