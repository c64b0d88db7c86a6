//! Error types shared across tool implementations.

use thiserror::Error;

/// Errors surfaced by agent tools.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;
