//! Error types for the sync agent.

use progsync_model::ModelError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing a document.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether this error is retryable.
        retryable: bool,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server rejected the owner's credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server refused the request as malformed.
    #[error("request rejected ({code}): {message}")]
    Rejected {
        /// Machine-readable error code from the server.
        code: String,
        /// Message from the server.
        message: String,
    },

    /// The server failed to handle the request.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the server.
        message: String,
    },

    /// A conflict resolution was requested but none is pending.
    #[error("no conflict awaiting resolution")]
    NoPendingConflict,

    /// No local document has been loaded or fetched yet.
    #[error("no local document loaded")]
    NotLoaded,

    /// A local edit was invalid.
    #[error("invalid edit: {0}")]
    Edit(#[from] ModelError),

    /// The durable local cache failed.
    #[error("local cache error: {0}")]
    Cache(String),

    /// The server sent something that is not a valid response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        SyncError::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        SyncError::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the operation may succeed when retried later.
    ///
    /// Retryable errors put the agent offline; local edits stay pending.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Cache(err.to_string())
    }
}
