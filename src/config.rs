//! Configuration for poststage.
//!
//! Loaded from `poststage.toml` (or `--config <path>`). Every section is
//! optional; a missing file yields the defaults:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! base_url = "https://stage.example.com"
//!
//! [storage]
//! backend = "filesystem"   # or "memory"
//! path = "./data"
//!
//! [sweep]
//! enabled = true
//! schedule = "0 0 3 * * *"
//! secret_env = "CRON_SECRET"
//!
//! [render.cta]
//! url = "https://example.com"
//! label = "Try it"
//!
//! [logging]
//! format = "pretty"        # or "json"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::render::{CallToAction, RenderOptions};

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sweep: SweepConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used in post and image links.
    pub base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_HOST.to_string(),
            port: constants::DEFAULT_PORT,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    #[default]
    Filesystem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Filesystem,
            path: Some(PathBuf::from("data")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    /// Cron expression with a seconds field.
    pub schedule: String,
    /// Environment variable holding the sweep trigger secret.
    pub secret_env: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: constants::DEFAULT_SWEEP_SCHEDULE.to_string(),
            secret_env: constants::DEFAULT_SECRET_ENV.to_string(),
        }
    }
}

impl SweepConfig {
    /// Reads the trigger secret from the environment. Empty counts as unset.
    pub fn secret(&self) -> Option<String> {
        std::env::var(&self.secret_env)
            .ok()
            .filter(|secret| !secret.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub cta: Option<CallToAction>,
}

impl RenderConfig {
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            cta: self.cta.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Loads `path`, or the defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default().with_env_overrides());
        }
        Ok(Self::load_from(path)?.with_env_overrides())
    }

    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or values
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies `POSTSTAGE_BASE_URL` if set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(constants::BASE_URL_ENV)
            && !base_url.is_empty()
        {
            self.server.base_url = Some(base_url);
        }
        self
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.server.base_url.as_deref().map_or_else(
            || format!("http://{}:{}", self.server.host, self.server.port),
            |url| url.trim_end_matches('/').to_string(),
        )
    }

    /// Local URL of the HTTP API, used by the CLI to reach a running
    /// server. Wildcard bind addresses map to loopback.
    pub fn api_url(&self) -> String {
        let host = match self.server.host.as_str() {
            "" | "0.0.0.0" => "127.0.0.1".to_string(),
            "::" | "[::]" => "[::1]".to_string(),
            host if host.contains(':') && !host.starts_with('[') => format!("[{host}]"),
            host => host.to_string(),
        };
        format!("http://{host}:{}", self.server.port)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Port 0
    /// - Malformed `base_url`
    /// - Filesystem backend without a path
    /// - Empty sweep schedule or secret variable name
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port cannot be 0".to_string());
        } else if self.server.port < 1024 {
            warnings.push(format!(
                "server.port {} is a privileged port (< 1024)",
                self.server.port
            ));
        }

        if let Some(base_url) = &self.server.base_url {
            match url::Url::parse(base_url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {},
                Ok(parsed) => errors.push(format!(
                    "server.base_url must use http or https (got: '{}')",
                    parsed.scheme()
                )),
                Err(e) => errors.push(format!("server.base_url is not a valid URL: {e}")),
            }
        }

        if self.storage.backend == StorageBackendKind::Filesystem
            && self
                .storage
                .path
                .as_ref()
                .is_none_or(|p| p.as_os_str().is_empty())
        {
            errors.push("storage.path is required for the filesystem backend".to_string());
        }
        if self.storage.backend == StorageBackendKind::Memory {
            warnings.push("storage.backend = \"memory\": posts are lost on restart".to_string());
        }

        if self.sweep.enabled && self.sweep.schedule.trim().is_empty() {
            errors.push("sweep.schedule cannot be empty when sweeps are enabled".to_string());
        }
        if self.sweep.secret_env.trim().is_empty() {
            errors.push("sweep.secret_env cannot be empty".to_string());
        }

        if let Some(cta) = &self.render.cta
            && url::Url::parse(&cta.url).is_err()
        {
            errors.push(format!("render.cta.url is not a valid URL: '{}'", cta.url));
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}
