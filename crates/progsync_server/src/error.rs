//! Error types for the sync server.

use progsync_storage::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
///
/// A version conflict is not an error: it is reported as
/// [`crate::SubmitOutcome::Conflict`].
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No usable owner identity was presented.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The presented identity was rejected.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Concurrent writers kept winning the compare-and-set.
    #[error("document busy: gave up after {attempts} write attempts")]
    Busy {
        /// Attempts made.
        attempts: u32,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::AuthenticationFailed(_)
                | ServerError::NotAuthorized(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_) | ServerError::Busy { .. } | ServerError::Internal(_)
        )
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "INVALID_REQUEST",
            ServerError::AuthenticationFailed(_) => "UNAUTHENTICATED",
            ServerError::NotAuthorized(_) => "NOT_AUTHORIZED",
            ServerError::Store(_) => "STORE_ERROR",
            ServerError::Busy { .. } => "BUSY",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(ServerError::Busy { attempts: 3 }.is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
        assert!(!ServerError::NotAuthorized("no".into()).is_server_error());
    }

    #[test]
    fn store_errors_convert() {
        let err: ServerError = StoreError::Corrupted("x".into()).into();
        assert!(err.is_server_error());
        assert_eq!(err.code(), "STORE_ERROR");
    }
}
