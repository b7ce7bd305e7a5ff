//! Application error types and result alias.

use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, SweeperError>;

/// Application error types
#[derive(Error, Debug)]
pub enum SweeperError {
    /// A path does not map to a valid artifact reference under the
    /// repository layout.
    #[error("Layout error: {0}")]
    Layout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
