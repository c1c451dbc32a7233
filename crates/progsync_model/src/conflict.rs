//! Conflict descriptors and resolutions.

use crate::document::DaySnapshot;
use crate::messages::DocumentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a submission could not be applied automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    /// The divergence was classified as unsafe to auto-merge.
    Incompatible,
    /// The merge produced an invalid document and was discarded.
    MergeFailed,
}

impl ConflictReason {
    /// Human-readable message sent in the `error` field.
    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::Incompatible => "Version conflict detected",
            ConflictReason::MergeFailed => "Automatic merge failed",
        }
    }
}

/// Returned instead of a new state when a submission needs the user.
///
/// The server state it carries is the unmodified authoritative document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPayload {
    /// Message describing the conflict.
    pub error: String,
    /// Why the submission was not applied.
    pub reason: ConflictReason,
    /// Authoritative days.
    pub server_data: Vec<DaySnapshot>,
    /// Authoritative version.
    pub server_version: u64,
    /// Authoritative last-write time.
    pub server_last_updated: DateTime<Utc>,
    /// Always true: the client must ask the user.
    pub requires_user_resolution: bool,
}

impl ConflictPayload {
    /// Creates a conflict around the current server state.
    pub fn new(reason: ConflictReason, server: DocumentState) -> Self {
        Self {
            error: reason.message().to_string(),
            reason,
            server_data: server.data,
            server_version: server.version,
            server_last_updated: server.last_updated,
            requires_user_resolution: true,
        }
    }

    /// The server state carried by this conflict.
    pub fn server_state(&self) -> DocumentState {
        DocumentState {
            data: self.server_data.clone(),
            version: self.server_version,
            last_updated: self.server_last_updated,
        }
    }
}

/// The user's answer to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Adopt the server state and discard local edits since the last sync.
    UseServer,
    /// Force the local snapshot onto the server.
    KeepLocal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn conflict_payload_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let payload = ConflictPayload::new(
            ConflictReason::Incompatible,
            DocumentState {
                data: vec![DaySnapshot::new(1, "2024-06-01")],
                version: 5,
                last_updated: at,
            },
        );

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["serverVersion"], 5);
        assert_eq!(json["requiresUserResolution"], true);
        assert_eq!(json["reason"], "incompatible");
        assert_eq!(json["serverData"][0]["dayNumber"], 1);

        let state = payload.server_state();
        assert_eq!(state.version, 5);
        assert_eq!(state.last_updated, at);
    }

    #[test]
    fn reason_messages_differ() {
        assert_ne!(
            ConflictReason::Incompatible.message(),
            ConflictReason::MergeFailed.message()
        );
    }
}
