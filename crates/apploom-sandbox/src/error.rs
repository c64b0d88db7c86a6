//! Error types for the sandbox gateway.

use thiserror::Error;

/// Errors surfaced by the sandbox gateway.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The remote environment was reclaimed, expired, or never existed.
    #[error("Sandbox unavailable: {0}")]
    Unavailable(String),

    #[error("Sandbox API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
