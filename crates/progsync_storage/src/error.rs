//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored document is unreadable or belongs to another owner.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Compare-and-set failed: another write landed first.
    #[error("version mismatch: expected {expected}, found {actual}")]
    VersionMismatch {
        /// Version the caller based its write on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },
}

impl StoreError {
    /// Returns true if re-reading and retrying the write may succeed.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, StoreError::VersionMismatch { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_display() {
        let err = StoreError::VersionMismatch {
            expected: 4,
            actual: 6,
        };
        assert!(err.is_version_mismatch());
        let msg = err.to_string();
        assert!(msg.contains('4'));
        assert!(msg.contains('6'));

        assert!(!StoreError::Corrupted("bad".into()).is_version_mismatch());
    }
}
