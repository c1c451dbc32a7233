//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use progsync_model::{ConflictPayload, DocumentState, ForcePushRequest, SubmitRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The server's answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReply {
    /// The submission was written; this is the new authoritative state.
    Accepted(DocumentState),
    /// The submission was refused and needs the user.
    Conflict(ConflictPayload),
}

/// A sync transport handles communication with the sync server for one
/// owner.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process, mock for testing).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Fetches the authoritative state.
    async fn fetch(&self) -> SyncResult<DocumentState>;

    /// Submits local days against the version they are based on.
    async fn submit(&self, request: &SubmitRequest) -> SyncResult<SubmitReply>;

    /// Replaces the authoritative days unconditionally.
    async fn force_push(&self, request: &ForcePushRequest) -> SyncResult<DocumentState>;

    /// Fetches the authoritative state for a hard refresh.
    async fn force_sync(&self) -> SyncResult<DocumentState>;
}

/// A mock transport for testing.
///
/// Replies are configured up front and every request is recorded.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    delay: Mutex<Option<Duration>>,
    fetch_response: Mutex<Option<DocumentState>>,
    submit_response: Mutex<Option<SubmitReply>>,
    force_response: Mutex<Option<DocumentState>>,
    submitted: Mutex<Vec<SubmitRequest>>,
    force_pushed: Mutex<Vec<ForcePushRequest>>,
}

impl MockTransport {
    /// Creates a new connected mock transport with no replies configured.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            delay: Mutex::new(None),
            fetch_response: Mutex::new(None),
            submit_response: Mutex::new(None),
            force_response: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
            force_pushed: Mutex::new(Vec::new()),
        }
    }

    /// Sets the state returned by `fetch` and `force_sync`.
    pub fn set_fetch_response(&self, state: DocumentState) {
        *self.fetch_response.lock() = Some(state);
    }

    /// Sets the reply to `submit`.
    pub fn set_submit_response(&self, reply: SubmitReply) {
        *self.submit_response.lock() = Some(reply);
    }

    /// Sets the state returned by `force_push`.
    pub fn set_force_response(&self, state: DocumentState) {
        *self.force_response.lock() = Some(state);
    }

    /// Delays every reply, to simulate a slow server.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Submissions received so far.
    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted.lock().clone()
    }

    /// Force-pushes received so far.
    pub fn force_pushed(&self) -> Vec<ForcePushRequest> {
        self.force_pushed.lock().clone()
    }

    async fn round_trip(&self) -> SyncResult<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::transport_retryable("not connected"))
        }
    }

    fn configured<T: Clone>(slot: &Mutex<Option<T>>, what: &str) -> SyncResult<T> {
        slot.lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol(format!("no {what} response configured")))
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn fetch(&self) -> SyncResult<DocumentState> {
        self.round_trip().await?;
        Self::configured(&self.fetch_response, "fetch")
    }

    async fn submit(&self, request: &SubmitRequest) -> SyncResult<SubmitReply> {
        self.submitted.lock().push(request.clone());
        self.round_trip().await?;
        Self::configured(&self.submit_response, "submit")
    }

    async fn force_push(&self, request: &ForcePushRequest) -> SyncResult<DocumentState> {
        self.force_pushed.lock().push(request.clone());
        self.round_trip().await?;
        Self::configured(&self.force_response, "force-push")
    }

    async fn force_sync(&self) -> SyncResult<DocumentState> {
        self.round_trip().await?;
        Self::configured(&self.fetch_response, "fetch")
    }
}
