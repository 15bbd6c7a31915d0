//! Shared-secret gate for the sweep trigger.
//!
//! The caller must send `Authorization: Bearer <secret>`. The comparison is
//! exact and constant-time. With no secret configured the trigger is closed.

use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// The server has no secret configured.
    NotConfigured,
    /// No usable `Authorization` header.
    Missing,
    /// The credential did not match.
    Mismatch,
}

impl AuthRejection {
    pub fn reason(self) -> &'static str {
        match self {
            Self::NotConfigured => "sweep secret not configured",
            Self::Missing => "missing bearer credential",
            Self::Mismatch => "invalid bearer credential",
        }
    }
}

/// Checks the request's bearer credential against `secret`.
pub fn check_bearer(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AuthRejection> {
    let secret = secret.ok_or(AuthRejection::NotConfigured)?;

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthRejection::Missing)?;

    let expected = format!("Bearer {secret}");
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthRejection::Mismatch)
    }
}
