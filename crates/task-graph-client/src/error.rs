//! Error types for the snapshot source and live update channel.

use thiserror::Error;

/// Errors raised while talking to the task server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, TLS or body transfer failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP error! Status: {status} ({url})")]
    Status { status: u16, url: String },

    /// The response body was not a task snapshot.
    #[error("Invalid snapshot payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The event stream failed or ended.
    #[error("Event stream failed: {0}")]
    Stream(String),
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
