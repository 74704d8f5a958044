//! Runtime error types.

use thiserror::Error;

/// Result type for background fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while acquiring a background image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URI scheme has no transport.
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    /// HTTP layer failed (connection, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP status {status} for {uri}")]
    Status {
        /// Status code returned.
        status: u16,
        /// Requested URI.
        uri: String,
    },

    /// Reading a local file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The response exceeded the configured size limit.
    #[error("Response too large: {0} bytes")]
    TooLarge(usize),

    /// A `data:` URI could not be parsed.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The fetch did not complete in time.
    #[error("Fetch timed out")]
    Timeout,
}

/// Errors surfaced by the document runtime itself.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The document actor has stopped.
    #[error("Document actor is not running")]
    ActorStopped,

    /// Core model or persistence error.
    #[error(transparent)]
    Core(#[from] emoji_core::CoreError),

    /// A background task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
