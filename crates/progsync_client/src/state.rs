//! Agent status, events and statistics.

use chrono::{DateTime, Utc};
use progsync_model::{ConflictPayload, Resolution};

/// The current status of a sync agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing has been synced yet.
    Idle,
    /// A push or pull is in flight.
    Syncing,
    /// The last push or pull adopted a server state.
    Synced,
    /// The last pull found nothing new and nothing to push.
    UpToDate,
    /// The server could not be reached; local edits are kept.
    Offline,
    /// A conflict awaits the user's resolution.
    Conflict,
    /// The last request failed with a non-retryable error.
    Error,
}

impl SyncStatus {
    /// Returns true if a request is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// Returns true if the user has to act before the agent pushes again.
    pub fn needs_user(&self) -> bool {
        matches!(self, SyncStatus::Conflict)
    }
}

/// Notifications published by the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A push was accepted.
    Synced {
        /// Version assigned by the server.
        version: u64,
    },
    /// A pull found the local copy current.
    UpToDate {
        /// Local version.
        version: u64,
    },
    /// A pull adopted a newer server state.
    ExternalUpdate {
        /// Adopted version.
        version: u64,
        /// Whether unsynced local edits were dropped.
        discarded_local_changes: bool,
    },
    /// The server could not be reached.
    Offline {
        /// Failure description.
        error: String,
    },
    /// A push was refused and needs the user.
    Conflict(ConflictPayload),
    /// The user resolved a conflict.
    ConflictResolved {
        /// The chosen resolution.
        resolution: Resolution,
        /// Version after resolution.
        version: u64,
    },
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of accepted pushes.
    pub pushes: u64,
    /// Total number of completed pulls.
    pub pulls: u64,
    /// Total number of conflicts encountered.
    pub conflicts: u64,
    /// Total number of scheduled retries.
    pub retries: u64,
    /// Last time a server state was adopted.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}
