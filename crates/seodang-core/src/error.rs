//! Error types for seodang-core

use thiserror::Error;

/// Result type alias using seodang-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in seodang-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with a non-2xx status; the message is taken
    /// from the response body (`message`/`error` field) or the status text
    #[error("{0}")]
    Api(String),

    /// A mutating operation was invoked without an active session.
    /// Raised locally, before any network call
    #[error("Login required")]
    AuthRequired,

    /// Transport-level failure before any HTTP status was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response payload did not match the expected shape
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Token persistence failed
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
