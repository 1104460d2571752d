//! Domain-specific error types for the facelink client.
//!
//! All fallible operations return `Result<T, FaceLinkError>`.
//! Malformed wire input is reported, never panicked on.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the facelink client.
#[derive(Debug, Error)]
pub enum FaceLinkError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A block header could not be read from the available bytes.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// A block (or the container around it) ended before its declared
    /// contents did.
    #[error("truncated {what}: needed {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A top-level block declared a size above the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Name resolution produced no candidate endpoints.
    #[error("no endpoints resolved for {0}")]
    NoEndpoints(String),

    /// Every candidate endpoint refused or failed.
    #[error("all {attempted} endpoints failed, last ({last_addr}): {last_error}")]
    AllEndpointsFailed {
        attempted: usize,
        last_addr: SocketAddr,
        last_error: std::io::Error,
    },

    /// A connect attempt exceeded its deadline.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    /// `close()` was requested before the connection was established.
    #[error("connection attempt cancelled")]
    Cancelled,

    /// `connect()` was called while a connection is active.
    #[error("client is already {0}")]
    AlreadyConnected(String),

    /// The background worker could not be started.
    #[error("failed to start network worker: {0}")]
    Worker(String),

    // ── Mesh Errors ──────────────────────────────────────────────
    /// A mesh importer could not produce a mesh set.
    #[error("mesh import failed: {0}")]
    MeshImport(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FaceLinkError>;

// ── Convenient From implementations ──────────────────────────────

impl From<String> for FaceLinkError {
    fn from(s: String) -> Self {
        FaceLinkError::Other(s)
    }
}

impl From<&str> for FaceLinkError {
    fn from(s: &str) -> Self {
        FaceLinkError::Other(s.to_string())
    }
}
