//! Protocol messages exchanged with the sync server.

use crate::document::{DaySnapshot, ProgressDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A copy of the authoritative document as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Days.
    pub data: Vec<DaySnapshot>,
    /// Version of `data`.
    pub version: u64,
    /// Time `data` was last accepted by the server.
    pub last_updated: DateTime<Utc>,
}

impl From<ProgressDocument> for DocumentState {
    fn from(doc: ProgressDocument) -> Self {
        Self {
            data: doc.days,
            version: doc.version,
            last_updated: doc.last_updated,
        }
    }
}

impl From<&ProgressDocument> for DocumentState {
    fn from(doc: &ProgressDocument) -> Self {
        Self {
            data: doc.days.clone(),
            version: doc.version,
            last_updated: doc.last_updated,
        }
    }
}

/// Body of `POST /document`.
///
/// `client_version` and `last_updated` are absent on a first sync or from a
/// caller that never learned a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Submitted days. Absent or null is malformed.
    #[serde(default)]
    pub data: Option<Vec<DaySnapshot>>,
    /// Version the client last saw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<u64>,
    /// Timestamp the client last saw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SubmitRequest {
    /// Creates a submission based on a known server state.
    pub fn new(data: Vec<DaySnapshot>, client_version: u64, last_updated: DateTime<Utc>) -> Self {
        Self {
            data: Some(data),
            client_version: Some(client_version),
            last_updated: Some(last_updated),
        }
    }

    /// Creates a submission with no version information.
    pub fn unversioned(data: Vec<DaySnapshot>) -> Self {
        Self {
            data: Some(data),
            client_version: None,
            last_updated: None,
        }
    }
}

/// Body of `POST /document/force-push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ForcePushRequest {
    /// Days that replace the authoritative content.
    #[serde(default)]
    pub data: Option<Vec<DaySnapshot>>,
}

impl ForcePushRequest {
    /// Creates a force-push request.
    pub fn new(data: Vec<DaySnapshot>) -> Self {
        Self { data: Some(data) }
    }
}

/// Error body returned for non-conflict failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always true when the server answers.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Whether bearer-token authentication is enforced.
    pub auth_enabled: bool,
}
