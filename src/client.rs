//! HTTP client for a running `poststage serve`.
//!
//! While the server is up it owns the store (the filesystem backend holds an
//! exclusive lock on its metadata database, the memory backend lives only in
//! the server process), so CLI commands go through the API instead.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::constants::{HEALTH_CHECK_TIMEOUT_MS, REQUEST_TIMEOUT_SECS};
use crate::post::Post;
use crate::server::types::{
    CleanupResponse, CompletePostResponse, DeletePostResponse, ErrorResponse, HealthResponse,
    PostListResponse, PostResponse,
};

/// Client for the post API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    secret: Option<String>,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`. `secret` is sent as
    /// the bearer credential on sweep requests.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, secret: Option<String>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid server URL: {base_url}");
        }

        let http = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS + 5))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            secret,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Whether a poststage server answers `/health` at the base URL.
    pub async fn is_up(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => resp
                .json::<HealthResponse>()
                .await
                .is_ok_and(|health| health.status == "ok"),
            _ => false,
        }
    }

    /// `GET /api/posts`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn list(&self) -> Result<Vec<Post>> {
        let url = self.endpoint(&["api", "posts"])?;
        let body: PostListResponse = self.send(self.http.get(url)).await?;
        Ok(body.posts)
    }

    /// `GET /api/posts/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the post does not exist.
    pub async fn get(&self, id: &str) -> Result<Post> {
        let url = self.endpoint(&["api", "posts", id])?;
        let body: PostResponse = self.send(self.http.get(url)).await?;
        Ok(body.post)
    }

    /// `POST /api/posts/{id}/complete`. Returns the new deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the post does not exist.
    pub async fn complete(&self, id: &str) -> Result<DateTime<Utc>> {
        let url = self.endpoint(&["api", "posts", id, "complete"])?;
        let body: CompletePostResponse = self.send(self.http.post(url)).await?;
        Ok(body.expires_at)
    }

    /// `DELETE /api/posts/{id}`. Returns the number of objects deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        let url = self.endpoint(&["api", "posts", id])?;
        let body: DeletePostResponse = self.send(self.http.delete(url)).await?;
        Ok(body.deleted)
    }

    /// `POST /api/cleanup` with the bearer secret.
    ///
    /// # Errors
    ///
    /// Returns an error if no secret is configured, the request fails, or
    /// the server rejects the credential.
    pub async fn cleanup(&self) -> Result<CleanupResponse> {
        let Some(secret) = &self.secret else {
            bail!("No sweep secret configured; the running server requires one for /api/cleanup");
        };
        let url = self.endpoint(&["api", "cleanup"])?;
        self.send(self.http.post(url).bearer_auth(secret)).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Invalid server URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.base_url))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .context("Unexpected response body from server");
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.error);
        bail!("Server returned {status}: {message}")
    }
}
