//! Shared test host for HTTP integration tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` against an
//! in-memory store and a fixed clock.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use poststage::render::{CallToAction, RenderOptions};
use poststage::server::{AppState, router};
use poststage::storage::ObjectStore;
use poststage::{FixedClock, LifecycleManager, PostRepository};

pub const BASE_URL: &str = "http://stage.test";
pub const SECRET: &str = "test-secret";

/// A response with its body collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is not UTF-8")
    }
}

pub struct TestHostBuilder {
    secret: Option<String>,
    render: RenderOptions,
    storage_dir: Option<PathBuf>,
}

impl TestHostBuilder {
    pub fn without_secret(mut self) -> Self {
        self.secret = None;
        self
    }

    /// Use the filesystem backend rooted at `dir` instead of memory.
    pub fn on_disk(mut self, dir: &Path) -> Self {
        self.storage_dir = Some(dir.to_path_buf());
        self
    }

    pub fn with_cta(mut self, url: &str, label: &str) -> Self {
        self.render.cta = Some(CallToAction {
            url: url.to_string(),
            label: label.to_string(),
            tagline: None,
        });
        self
    }

    pub fn start(self) -> TestHost {
        let clock = FixedClock::new(start_time());
        let store = match &self.storage_dir {
            Some(dir) => ObjectStore::filesystem(dir, BASE_URL).expect("failed to open storage"),
            None => ObjectStore::memory(BASE_URL),
        };
        let repo = PostRepository::new(store, Arc::new(clock.clone()));
        let lifecycle = LifecycleManager::new(repo);
        let state = AppState::new(lifecycle.clone(), BASE_URL)
            .with_sweep_secret(self.secret)
            .with_render(self.render);

        TestHost {
            app: router(Arc::new(state)),
            clock,
            lifecycle,
        }
    }
}

pub struct TestHost {
    app: Router,
    pub clock: FixedClock,
    pub lifecycle: LifecycleManager,
}

impl TestHost {
    pub fn builder() -> TestHostBuilder {
        TestHostBuilder {
            secret: Some(SECRET.to_string()),
            render: RenderOptions::default(),
            storage_dir: None,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body")
            .to_vec();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(empty(Method::GET, uri)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(empty(Method::DELETE, uri)).await
    }

    pub async fn post_empty(&self, uri: &str) -> TestResponse {
        self.send(empty(Method::POST, uri)).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn cleanup(&self, method: Method, authorization: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri("/api/cleanup");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn empty(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
