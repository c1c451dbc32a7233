//! The authoritative side of the sync protocol.

use crate::classifier::{Compatibility, CompatibilityClassifier};
use crate::config::SyncPolicy;
use crate::error::{ServerError, ServerResult};
use crate::merge::merge;
use chrono::{DateTime, Utc};
use progsync_model::{
    validate_days, Clock, ConflictPayload, ConflictReason, DaySnapshot, DocumentState, OwnerId,
    ProgressDocument, SubmitRequest,
};
use progsync_storage::{DocumentStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How an accepted submission was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptPath {
    /// No version information was supplied.
    Unversioned,
    /// The submission was current, or stale only within the grace window.
    Outright,
    /// The submission diverged and was merged into the server state.
    Merged,
    /// The submission replaced the server state unconditionally.
    Forced,
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The store now holds `state`.
    Accepted {
        /// New authoritative state.
        state: DocumentState,
        /// Which branch of the protocol accepted it.
        path: AcceptPath,
    },
    /// Nothing was written; the user must decide.
    Conflict(ConflictPayload),
}

impl SubmitOutcome {
    /// Returns the accepted state, if any.
    pub fn accepted(&self) -> Option<&DocumentState> {
        match self {
            SubmitOutcome::Accepted { state, .. } => Some(state),
            SubmitOutcome::Conflict(_) => None,
        }
    }

    /// Returns the conflict, if any.
    pub fn conflict(&self) -> Option<&ConflictPayload> {
        match self {
            SubmitOutcome::Conflict(payload) => Some(payload),
            SubmitOutcome::Accepted { .. } => None,
        }
    }
}

/// What to do with one submission against one loaded server document.
enum Decision {
    Write(Vec<DaySnapshot>, AcceptPath),
    Reject(ConflictReason),
}

/// Orchestrates submissions against a [`DocumentStore`].
///
/// Every accepted write bumps the version by exactly one and stamps
/// `last_updated` from the clock. A write is persisted with a
/// compare-and-set against the version it was computed from; when another
/// writer got there first, the whole protocol is re-run against the fresh
/// state.
pub struct SyncCoordinator {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    policy: SyncPolicy,
    classifier: CompatibilityClassifier,
}

impl SyncCoordinator {
    /// Creates a coordinator.
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, policy: SyncPolicy) -> Self {
        let classifier = CompatibilityClassifier::from_policy(&policy);
        Self {
            store,
            clock,
            policy,
            classifier,
        }
    }

    /// Returns the policy in effect.
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Returns the owner's authoritative state, seeding it on first access.
    pub fn current(&self, owner: &OwnerId) -> ServerResult<DocumentState> {
        Ok(self.store.get(owner)?.into())
    }

    /// Submits a client snapshot through the version/timestamp protocol.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidRequest`] if the snapshot is missing or has
    ///   duplicate day numbers; the store is not touched
    /// - [`ServerError::Busy`] if every write attempt lost a race
    /// - [`ServerError::Store`] if the store fails
    pub fn submit(&self, owner: &OwnerId, request: SubmitRequest) -> ServerResult<SubmitOutcome> {
        let data = validated(request.data)?;
        let base = request.client_version.zip(request.last_updated);

        self.with_retries(owner, |server| match base {
            None => Decision::Write(data.clone(), AcceptPath::Unversioned),
            Some((client_version, client_ts)) => {
                self.decide(server, &data, client_version, client_ts)
            }
        })
    }

    /// Replaces the owner's content unconditionally.
    ///
    /// This is the user-initiated override for a conflict resolved in
    /// favor of the local snapshot. Version ordering is ignored: the result
    /// is always the stored version plus one.
    ///
    /// # Errors
    ///
    /// Same as [`SyncCoordinator::submit`], minus conflicts.
    pub fn force_submit(
        &self,
        owner: &OwnerId,
        data: Option<Vec<DaySnapshot>>,
    ) -> ServerResult<DocumentState> {
        let data = validated(data)?;

        match self.with_retries(owner, |_| Decision::Write(data.clone(), AcceptPath::Forced))? {
            SubmitOutcome::Accepted { state, .. } => Ok(state),
            SubmitOutcome::Conflict(_) => Err(ServerError::Internal(
                "forced submission produced a conflict".into(),
            )),
        }
    }

    fn decide(
        &self,
        server: &ProgressDocument,
        client: &[DaySnapshot],
        client_version: u64,
        client_ts: DateTime<Utc>,
    ) -> Decision {
        let delta_ms = (server.last_updated - client_ts).num_milliseconds();
        let diverged =
            delta_ms > self.policy.grace_window_millis() && client_version < server.version;

        if !diverged {
            return Decision::Write(client.to_vec(), AcceptPath::Outright);
        }

        match self.classifier.classify(&server.days, client) {
            Compatibility::Compatible => match merge(&server.days, client) {
                Ok(merged) => Decision::Write(merged, AcceptPath::Merged),
                Err(e) => {
                    warn!(
                        owner = %server.owner_id,
                        server_version = server.version,
                        error = %e,
                        "merge failed, returning conflict"
                    );
                    Decision::Reject(ConflictReason::MergeFailed)
                }
            },
            Compatibility::Incompatible(reason) => {
                info!(
                    owner = %server.owner_id,
                    server_version = server.version,
                    client_version,
                    delta_ms,
                    %reason,
                    "incompatible divergence, returning conflict"
                );
                Decision::Reject(ConflictReason::Incompatible)
            }
        }
    }

    fn with_retries<F>(&self, owner: &OwnerId, decide: F) -> ServerResult<SubmitOutcome>
    where
        F: Fn(&ProgressDocument) -> Decision,
    {
        let attempts = self.policy.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let server = self.store.get(owner)?;

            let (days, path) = match decide(&server) {
                Decision::Write(days, path) => (days, path),
                Decision::Reject(reason) => {
                    return Ok(SubmitOutcome::Conflict(ConflictPayload::new(
                        reason,
                        server.into(),
                    )));
                }
            };

            match self.commit(&server, days) {
                Ok(state) => {
                    debug!(
                        owner = %owner,
                        version = state.version,
                        path = ?path,
                        "accepted submission"
                    );
                    return Ok(SubmitOutcome::Accepted { state, path });
                }
                Err(StoreError::VersionMismatch { expected, actual }) => {
                    warn!(
                        owner = %owner,
                        expected,
                        actual,
                        attempt,
                        "lost write race, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServerError::Busy { attempts })
    }

    fn commit(
        &self,
        server: &ProgressDocument,
        days: Vec<DaySnapshot>,
    ) -> Result<DocumentState, StoreError> {
        let next = ProgressDocument {
            owner_id: server.owner_id.clone(),
            days,
            version: server.version + 1,
            last_updated: self.clock.now(),
        };
        self.store.put(&next, server.version)?;
        Ok(next.into())
    }
}

fn validated(data: Option<Vec<DaySnapshot>>) -> ServerResult<Vec<DaySnapshot>> {
    let data = data.ok_or_else(|| ServerError::InvalidRequest("missing document data".into()))?;
    validate_days(&data).map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    Ok(data)
}
