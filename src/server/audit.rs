//! Security audit logging for the HTTP API.
//!
//! Events go to the `audit` tracing target so they can be filtered or
//! shipped separately (`RUST_LOG=audit=info`).

use std::net::SocketAddr;
use tracing::{info, warn};

/// Security-relevant events.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// The sweep trigger was called without a valid secret.
    AuthFailure {
        remote_addr: Option<SocketAddr>,
        reason: &'static str,
    },
    /// The sweep trigger was called with the right secret.
    AuthSuccess { remote_addr: Option<SocketAddr> },
    /// A blob request used a key outside `posts/` or one that could escape
    /// the store.
    PathTraversalBlocked { path: String },
}

/// Log a security audit event with structured fields.
pub fn log_audit_event(event: AuditEvent) {
    match event {
        AuditEvent::AuthFailure {
            remote_addr,
            reason,
        } => {
            warn!(
                target: "audit",
                event_type = "auth_failure",
                remote_addr = ?remote_addr,
                reason,
                "Sweep trigger authentication failed"
            );
        },
        AuditEvent::AuthSuccess { remote_addr } => {
            info!(
                target: "audit",
                event_type = "auth_success",
                remote_addr = ?remote_addr,
                "Sweep trigger authenticated"
            );
        },
        AuditEvent::PathTraversalBlocked { path } => {
            warn!(
                target: "audit",
                event_type = "path_traversal_blocked",
                %path,
                "Blob path rejected"
            );
        },
    }
}
