//! HTTP endpoint integration tests.
//!
//! Covers the post API, the image upload endpoint, the secret-gated cleanup
//! trigger, the preview page and blob serving.

#[path = "common.rs"]
mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, TimeDelta, Utc};
use common::{BASE_URL, SECRET, TestHost, start_time};
use serde_json::json;

/// `iVBORw0KGgo=` is the 8-byte PNG signature.
const PNG_BASE64: &str = "iVBORw0KGgo=";
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn parse_time(value: &serde_json::Value) -> DateTime<Utc> {
    value
        .as_str()
        .expect("timestamp is a string")
        .parse()
        .expect("timestamp is RFC 3339")
}

async fn create(host: &TestHost, id: &str) -> serde_json::Value {
    let resp = host
        .post_json(
            "/api/posts",
            json!({ "id": id, "title": "Hello", "body": "First line" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    resp.json()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let host = TestHost::builder().start();
    let resp = host.get("/health").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}

// =============================================================================
// Create / read
// =============================================================================

#[tokio::test]
async fn test_create_returns_id_url_and_expiry() {
    let host = TestHost::builder().start();
    let resp = host
        .post_json(
            "/api/posts",
            json!({
                "topicId": "face-reading",
                "title": "Reading faces",
                "body": "Intro",
                "hashtags": ["faces", "reading"]
            }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let id = body["id"].as_str().unwrap();
    assert_eq!(
        id,
        format!("face-reading-{}", start_time().timestamp_millis())
    );
    assert_eq!(body["success"], true);
    assert_eq!(body["url"], format!("{BASE_URL}/post/{id}"));
    assert_eq!(
        parse_time(&body["expiresAt"]),
        start_time() + TimeDelta::days(7)
    );
}

#[tokio::test]
async fn test_get_returns_stored_post() {
    let host = TestHost::builder().start();
    create(&host, "p1").await;

    let resp = host.get("/api/posts/p1").await;
    assert_eq!(resp.status, StatusCode::OK);

    let post = &resp.json()["post"];
    assert_eq!(post["id"], "p1");
    assert_eq!(post["title"], "Hello");
    assert_eq!(parse_time(&post["createdAt"]), start_time());
    assert!(post.get("completedAt").is_none());
}

#[tokio::test]
async fn test_create_with_inline_images() {
    let host = TestHost::builder().start();
    let resp = host
        .post_json(
            "/api/posts",
            json!({
                "id": "with-images",
                "title": "Pictures",
                "body": "**[image: one]**\n\n**[image: two]**",
                "images": [
                    format!("data:image/png;base64,{PNG_BASE64}"),
                    { "data": format!("data:image/jpeg;base64,{PNG_BASE64}") }
                ]
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());

    let post = host.get("/api/posts/with-images").await.json()["post"].clone();
    let images: Vec<&str> = post["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        images,
        [
            format!("{BASE_URL}/blobs/posts/with-images/image-1.png"),
            format!("{BASE_URL}/blobs/posts/with-images/image-2.jpg"),
        ]
    );
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let host = TestHost::builder().start();

    let resp = host
        .post_json("/api/posts", json!({ "topicId": "t", "body": "B" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["error"].as_str().unwrap().contains("title"));

    let resp = host
        .post_json("/api/posts", json!({ "title": "T", "body": "B" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_duplicate_id() {
    let host = TestHost::builder().start();
    create(&host, "dup").await;

    let resp = host
        .post_json(
            "/api/posts",
            json!({ "id": "dup", "title": "Again", "body": "B" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_malformed_json() {
    let host = TestHost::builder().start();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let resp = host.send(request).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["error"].is_string());
}

#[tokio::test]
async fn test_get_unknown_post_is_404() {
    let host = TestHost::builder().start();

    let resp = host.get("/api/posts/missing").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json()["error"], "Post not found");
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let host = TestHost::builder().start();
    create(&host, "older").await;
    host.clock.advance(TimeDelta::hours(1));
    create(&host, "newer").await;

    let resp = host.get("/api/posts").await;
    assert_eq!(resp.status, StatusCode::OK);

    let ids: Vec<String> = resp.json()["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["newer", "older"]);
}

// =============================================================================
// Complete / delete
// =============================================================================

#[tokio::test]
async fn test_complete_resets_expiry_from_now() {
    let host = TestHost::builder().start();
    create(&host, "p1").await;

    host.clock.advance(TimeDelta::days(6));
    let resp = host.post_empty("/api/posts/p1/complete").await;
    assert_eq!(resp.status, StatusCode::OK);

    let completed_at = start_time() + TimeDelta::days(6);
    assert_eq!(
        parse_time(&resp.json()["expiresAt"]),
        completed_at + TimeDelta::days(5)
    );

    let post = host.get("/api/posts/p1").await.json()["post"].clone();
    assert_eq!(parse_time(&post["completedAt"]), completed_at);
}

#[tokio::test]
async fn test_complete_unknown_post_is_404() {
    let host = TestHost::builder().start();
    let resp = host.post_empty("/api/posts/nope/complete").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_removes_post_and_images() {
    let host = TestHost::builder().start();
    host.post_json(
        "/api/posts",
        json!({
            "id": "gone",
            "title": "T",
            "body": "B",
            "images": [PNG_BASE64]
        }),
    )
    .await;

    let resp = host.delete("/api/posts/gone").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["deleted"], 2);

    assert_eq!(host.get("/api/posts/gone").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        host.get("/blobs/posts/gone/image-1.png").await.status,
        StatusCode::NOT_FOUND
    );

    let resp = host.delete("/api/posts/gone").await;
    assert_eq!(resp.json()["deleted"], 0);
}

// =============================================================================
// Upload image
// =============================================================================

#[tokio::test]
async fn test_upload_image_then_create_with_urls() {
    let host = TestHost::builder().start();

    let resp = host
        .post_json(
            "/api/upload-image",
            json!({
                "postId": "staged",
                "imageIndex": 0,
                "imageData": format!("data:image/png;base64,{PNG_BASE64}")
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let body = resp.json();
    let url = body["url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("{BASE_URL}/blobs/posts/staged/image-1.png"));
    assert_eq!(body["imageIndex"], 0);

    let resp = host
        .post_json(
            "/api/posts",
            json!({
                "id": "staged",
                "title": "T",
                "body": "**[image: x]**",
                "imageUrls": [url]
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let post = host.get("/api/posts/staged").await.json()["post"].clone();
    assert_eq!(post["images"][0], url);
}

#[tokio::test]
async fn test_upload_image_requires_all_fields() {
    let host = TestHost::builder().start();

    for body in [
        json!({ "imageIndex": 0, "imageData": PNG_BASE64 }),
        json!({ "postId": "p", "imageData": PNG_BASE64 }),
        json!({ "postId": "p", "imageIndex": 0 }),
        json!({ "postId": "p", "imageIndex": 0, "imageData": "" }),
    ] {
        let resp = host.post_json("/api/upload-image", body.clone()).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(resp.json()["error"], "Missing required fields");
    }
}

#[tokio::test]
async fn test_upload_image_rejects_unsupported_type() {
    let host = TestHost::builder().start();
    let resp = host
        .post_json(
            "/api/upload-image",
            json!({
                "postId": "p",
                "imageIndex": 0,
                "imageData": "data:image/svg+xml;base64,PHN2Zy8+"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Cleanup trigger
// =============================================================================

#[tokio::test]
async fn test_cleanup_rejects_missing_credential() {
    let host = TestHost::builder().start();
    let resp = host.cleanup(Method::POST, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["error"], "Unauthorized");
}

#[tokio::test]
async fn test_cleanup_rejects_wrong_credential() {
    let host = TestHost::builder().start();
    for value in ["Bearer wrong", SECRET, "Basic dGVzdA=="] {
        let resp = host.cleanup(Method::POST, Some(value)).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{value}");
    }
}

#[tokio::test]
async fn test_cleanup_closed_without_secret() {
    let host = TestHost::builder().without_secret().start();
    let resp = host.cleanup(Method::POST, Some("Bearer ")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_deletes_only_expired_posts() {
    let host = TestHost::builder().start();
    create(&host, "stale").await;
    create(&host, "kept").await;

    host.clock.advance(TimeDelta::days(6));
    host.post_empty("/api/posts/kept/complete").await;
    host.clock.advance(TimeDelta::days(2));

    let auth = format!("Bearer {SECRET}");
    let resp = host.cleanup(Method::POST, Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedCount"], 1);
    assert_eq!(body["failedCount"], 0);

    assert_eq!(host.get("/api/posts/stale").await.status, StatusCode::NOT_FOUND);
    assert_eq!(host.get("/api/posts/kept").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cleanup_accepts_get() {
    let host = TestHost::builder().start();
    let auth = format!("Bearer {SECRET}");
    let resp = host.cleanup(Method::GET, Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["deletedCount"], 0);
}

#[tokio::test]
async fn test_post_at_exact_deadline_survives_cleanup() {
    let host = TestHost::builder().start();
    create(&host, "edge").await;

    host.clock.advance(TimeDelta::days(7));
    let auth = format!("Bearer {SECRET}");
    let resp = host.cleanup(Method::POST, Some(&auth)).await;
    assert_eq!(resp.json()["deletedCount"], 0);

    host.clock.advance(TimeDelta::milliseconds(1));
    let resp = host.cleanup(Method::POST, Some(&auth)).await;
    assert_eq!(resp.json()["deletedCount"], 1);
}

// =============================================================================
// Preview page and blobs
// =============================================================================

#[tokio::test]
async fn test_preview_page_renders_post() {
    let host = TestHost::builder()
        .with_cta("https://example.com", "Try it")
        .start();
    host.post_json(
        "/api/posts",
        json!({
            "id": "preview",
            "title": "Tom & Jerry",
            "body": "## Part one\n\nSome **bold** text",
            "hashtags": ["cartoons"]
        }),
    )
    .await;

    let resp = host.get("/post/preview").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.content_type.as_ref().unwrap().starts_with("text/html"));

    let html = resp.text();
    assert!(html.contains("<title>Tom &amp; Jerry</title>"));
    assert!(html.contains("<strong>bold</strong>"));
    assert!(html.contains("#cartoons"));
    assert!(html.contains(r#"href="https://example.com""#));
    assert!(html.contains("deleted automatically in 7 day(s)"));
}

#[tokio::test]
async fn test_preview_page_unknown_post() {
    let host = TestHost::builder().start();
    let resp = host.get("/post/missing").await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.text().contains("Post not found"));
}

#[tokio::test]
async fn test_blob_served_with_content_type() {
    let host = TestHost::builder().start();
    host.post_json(
        "/api/posts",
        json!({
            "id": "blob",
            "title": "T",
            "body": "B",
            "images": [format!("data:image/png;base64,{PNG_BASE64}")]
        }),
    )
    .await;

    let resp = host.get("/blobs/posts/blob/image-1.png").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.content_type.as_deref(), Some("image/png"));
    assert_eq!(resp.body, PNG_SIGNATURE);

    let resp = host.get("/blobs/posts/blob/meta.json").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["id"], "blob");
}

#[tokio::test]
async fn test_blob_rejects_traversal() {
    let host = TestHost::builder().start();
    let resp = host.get("/blobs/posts/../../etc/passwd").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blob_route_hides_storage_internals() {
    let dir = tempfile::TempDir::new().unwrap();
    let host = TestHost::builder().on_disk(dir.path()).start();
    create(&host, "p1").await;
    assert!(dir.path().join("metadata.redb").is_file());

    for uri in [
        "/blobs/metadata.redb",
        "/blobs/posts/p1/../../metadata.redb",
        "/blobs/posts/metadata.redb",
        "/blobs/other/file.txt",
    ] {
        let resp = host.get(uri).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND, "{uri}");
    }

    let resp = host.get("/blobs/posts/p1/meta.json").await;
    assert_eq!(resp.status, StatusCode::OK);
}
