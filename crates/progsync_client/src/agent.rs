//! The per-session sync agent.

use crate::cache::{CachedDocument, LocalCache};
use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::state::{SyncEvent, SyncStats, SyncStatus};
use crate::transport::{SubmitReply, SyncTransport};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use progsync_model::{
    validate_days, ConflictPayload, DaySnapshot, DocumentState, Edit, ForcePushRequest,
    ModelResult, OwnerId, Resolution, SubmitRequest,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// What a call to [`ClientSyncAgent::push`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The server accepted the local days at this version.
    Synced(u64),
    /// The server refused the local days; the conflict awaits the user.
    Conflict(ConflictPayload),
    /// There were no unsynced edits.
    NothingToPush,
    /// An earlier conflict still awaits the user; nothing was sent.
    AwaitingResolution,
    /// Another push or pull was in flight; nothing was sent.
    InFlight,
}

/// What a call to [`ClientSyncAgent::pull`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// A newer server state replaced the local copy.
    Updated {
        /// Adopted version.
        version: u64,
        /// Whether unsynced local edits were dropped.
        discarded_local_changes: bool,
    },
    /// The local copy was current and clean.
    UpToDate,
    /// The local copy was current with unsynced edits, which were pushed.
    Pushed(PushOutcome),
    /// A conflict awaits the user; the local copy was left alone.
    AwaitingResolution,
    /// Another push or pull was in flight; nothing was fetched.
    InFlight,
}

/// Clears the in-flight flag when dropped and wakes anyone waiting for it.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
    released: &'a Notify,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool, released: &'a Notify) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, released })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.released.notify_waiters();
    }
}

/// Keeps one session's copy of a document in sync with the server.
///
/// Local edits are applied and persisted immediately, then pushed in the
/// background. Pulls adopt newer server states. Refused pushes are held as
/// a pending conflict until the user picks a [`Resolution`].
///
/// Every agent owns its state; two agents never share a cache entry, a
/// guard or a conflict.
pub struct ClientSyncAgent {
    config: ClientConfig,
    transport: Arc<dyn SyncTransport>,
    cache: Arc<dyn LocalCache>,
    local: RwLock<Option<CachedDocument>>,
    conflict: Mutex<Option<ConflictPayload>>,
    syncing: AtomicBool,
    sync_released: Notify,
    /// Bumped on every local edit; lets a push detect edits made while it
    /// was in flight.
    edit_seq: AtomicU64,
    retry_attempt: AtomicU32,
    stats: RwLock<SyncStats>,
    status: watch::Sender<SyncStatus>,
    events: broadcast::Sender<SyncEvent>,
    push_requested: Notify,
}

impl ClientSyncAgent {
    /// Creates an agent with nothing loaded.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn SyncTransport>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            transport,
            cache,
            local: RwLock::new(None),
            conflict: Mutex::new(None),
            syncing: AtomicBool::new(false),
            sync_released: Notify::new(),
            edit_seq: AtomicU64::new(0),
            retry_attempt: AtomicU32::new(0),
            stats: RwLock::new(SyncStats::default()),
            status,
            events,
            push_requested: Notify::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the owner this agent syncs.
    pub fn owner(&self) -> &OwnerId {
        &self.config.owner
    }

    /// Returns the local copy, if loaded.
    pub fn document(&self) -> Option<CachedDocument> {
        self.local.read().clone()
    }

    /// Returns true if the local copy holds unsynced edits.
    pub fn has_pending_changes(&self) -> bool {
        self.local
            .read()
            .as_ref()
            .is_some_and(|doc| doc.pending_changes)
    }

    /// Returns the conflict awaiting the user, if any.
    pub fn pending_conflict(&self) -> Option<ConflictPayload> {
        self.conflict.lock().clone()
    }

    /// Returns the current status.
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Subscribes to status changes.
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Subscribes to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Loads the durable local copy, including its unsynced-edits flag.
    ///
    /// Returns false if nothing was stored for this owner.
    pub fn bootstrap(&self) -> SyncResult<bool> {
        let Some(doc) = self.cache.load(&self.config.owner)? else {
            debug!(owner = %self.config.owner, "No local document stored");
            return Ok(false);
        };
        info!(
            owner = %self.config.owner,
            version = doc.version,
            pending = doc.pending_changes,
            "Restored local document"
        );
        *self.local.write() = Some(doc);
        Ok(true)
    }

    /// Applies an edit to the local copy.
    pub fn apply(&self, edit: &Edit) -> SyncResult<()> {
        self.mutate(|days| edit.apply(days))
    }

    /// Applies a change to the local days.
    ///
    /// The change is persisted before this returns and a background push is
    /// requested. A change that fails, or leaves duplicate day numbers
    /// behind, is discarded without touching the local copy.
    pub fn mutate<F>(&self, change: F) -> SyncResult<()>
    where
        F: FnOnce(&mut Vec<DaySnapshot>) -> ModelResult<()>,
    {
        {
            let mut local = self.local.write();
            let mut next = local.as_ref().ok_or(SyncError::NotLoaded)?.clone();
            change(&mut next.data)?;
            validate_days(&next.data)?;
            next.pending_changes = true;
            self.cache.store(&next)?;
            *local = Some(next);
            self.edit_seq.fetch_add(1, Ordering::SeqCst);
        }
        self.push_requested.notify_one();
        Ok(())
    }

    /// Submits unsynced edits to the server.
    ///
    /// Does nothing while another push or pull is in flight, or while a
    /// conflict awaits the user. Retryable failures put the agent offline
    /// and keep the edits pending.
    pub async fn push(&self) -> SyncResult<PushOutcome> {
        let Some(_guard) = self.try_guard() else {
            debug!("Push skipped, sync in flight");
            return Ok(PushOutcome::InFlight);
        };
        self.push_exclusive().await
    }

    async fn push_exclusive(&self) -> SyncResult<PushOutcome> {
        if self.conflict.lock().is_some() {
            self.set_status(SyncStatus::Conflict);
            return Ok(PushOutcome::AwaitingResolution);
        }

        let (request, seq) = {
            let local = self.local.read();
            let doc = local.as_ref().ok_or(SyncError::NotLoaded)?;
            if !doc.pending_changes {
                return Ok(PushOutcome::NothingToPush);
            }
            (
                SubmitRequest::new(doc.data.clone(), doc.version, doc.last_updated),
                self.edit_seq.load(Ordering::SeqCst),
            )
        };

        self.set_status(SyncStatus::Syncing);
        debug!(client_version = ?request.client_version, "Pushing local changes");
        let reply = match self.bounded(self.transport.submit(&request)).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.failed(e)),
        };

        match reply {
            SubmitReply::Accepted(state) => {
                let version = state.version;
                self.adopt_pushed(state, seq)?;
                self.stats.write().pushes += 1;
                self.mark_synced(SyncStatus::Synced);
                info!(version, "Push accepted");
                self.emit(SyncEvent::Synced { version });
                Ok(PushOutcome::Synced(version))
            }
            SubmitReply::Conflict(payload) => {
                warn!(
                    server_version = payload.server_version,
                    reason = ?payload.reason,
                    "Push refused, awaiting user resolution"
                );
                *self.conflict.lock() = Some(payload.clone());
                self.stats.write().conflicts += 1;
                self.set_status(SyncStatus::Conflict);
                self.emit(SyncEvent::Conflict(payload.clone()));
                Ok(PushOutcome::Conflict(payload))
            }
        }
    }

    /// Fetches the authoritative state.
    ///
    /// A newer server version replaces the local copy wholesale, unsynced
    /// edits included. Otherwise unsynced edits are pushed.
    pub async fn pull(&self) -> SyncResult<PullOutcome> {
        let Some(_guard) = self.try_guard() else {
            debug!("Pull skipped, sync in flight");
            return Ok(PullOutcome::InFlight);
        };
        if self.conflict.lock().is_some() {
            self.set_status(SyncStatus::Conflict);
            return Ok(PullOutcome::AwaitingResolution);
        }

        self.set_status(SyncStatus::Syncing);
        let state = match self.bounded(self.transport.fetch()).await {
            Ok(state) => state,
            Err(e) => return Err(self.failed(e)),
        };
        self.stats.write().pulls += 1;

        let (local_version, pending) = self
            .local
            .read()
            .as_ref()
            .map_or((0, false), |doc| (doc.version, doc.pending_changes));

        if state.version > local_version {
            let version = state.version;
            self.replace_local(CachedDocument::from_state(self.config.owner.clone(), state))?;
            if pending {
                warn!(version, local_version, "Newer server state replaced unsynced local edits");
            } else {
                info!(version, "Adopted newer server state");
            }
            self.mark_synced(SyncStatus::Synced);
            self.emit(SyncEvent::ExternalUpdate {
                version,
                discarded_local_changes: pending,
            });
            return Ok(PullOutcome::Updated {
                version,
                discarded_local_changes: pending,
            });
        }

        if pending {
            return self.push_exclusive().await.map(PullOutcome::Pushed);
        }

        debug!(version = local_version, "Up to date");
        self.mark_synced(SyncStatus::UpToDate);
        self.emit(SyncEvent::UpToDate {
            version: local_version,
        });
        Ok(PullOutcome::UpToDate)
    }

    /// Resolves the pending conflict.
    ///
    /// [`Resolution::UseServer`] adopts the server state carried by the
    /// conflict. [`Resolution::KeepLocal`] force-pushes the local days. On
    /// failure the conflict stays pending.
    pub async fn resolve_conflict(&self, resolution: Resolution) -> SyncResult<DocumentState> {
        let _guard = self.exclusive().await;
        let conflict = self
            .conflict
            .lock()
            .clone()
            .ok_or(SyncError::NoPendingConflict)?;

        let state = match resolution {
            Resolution::UseServer => {
                let state = conflict.server_state();
                self.replace_local(CachedDocument::from_state(
                    self.config.owner.clone(),
                    state.clone(),
                ))?;
                state
            }
            Resolution::KeepLocal => {
                let (days, seq) = {
                    let local = self.local.read();
                    let doc = local.as_ref().ok_or(SyncError::NotLoaded)?;
                    (doc.data.clone(), self.edit_seq.load(Ordering::SeqCst))
                };
                self.set_status(SyncStatus::Syncing);
                let request = ForcePushRequest::new(days);
                let state = match self.bounded(self.transport.force_push(&request)).await {
                    Ok(state) => state,
                    Err(e) => return Err(self.failed(e)),
                };
                self.adopt_pushed(state.clone(), seq)?;
                self.stats.write().pushes += 1;
                state
            }
        };

        self.conflict.lock().take();
        info!(?resolution, version = state.version, "Conflict resolved");
        self.mark_synced(SyncStatus::Synced);
        self.emit(SyncEvent::ConflictResolved {
            resolution,
            version: state.version,
        });
        Ok(state)
    }

    /// Replaces the local copy with the server's, discarding unsynced edits
    /// and any pending conflict.
    pub async fn force_sync(&self) -> SyncResult<DocumentState> {
        let _guard = self.exclusive().await;
        self.set_status(SyncStatus::Syncing);
        let state = match self.bounded(self.transport.force_sync()).await {
            Ok(state) => state,
            Err(e) => return Err(self.failed(e)),
        };

        let discarded = self.has_pending_changes();
        self.replace_local(CachedDocument::from_state(
            self.config.owner.clone(),
            state.clone(),
        ))?;
        self.conflict.lock().take();
        self.stats.write().pulls += 1;
        info!(version = state.version, discarded, "Force-synced from server");
        self.mark_synced(SyncStatus::Synced);
        self.emit(SyncEvent::ExternalUpdate {
            version: state.version,
            discarded_local_changes: discarded,
        });
        Ok(state)
    }

    /// Starts the background loop.
    ///
    /// The loop syncs immediately and then every `pull_interval`, pushes
    /// `push_debounce` after a local edit, and retries with backoff while
    /// offline. A scheduled sync pushes while unsynced edits exist and
    /// pulls otherwise, so an automatic pull never drops local edits.
    pub fn spawn(self: &Arc<Self>) -> SyncHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let agent = Arc::clone(self);
        let task = tokio::spawn(async move { agent.run(shutdown_rx).await });
        SyncHandle { shutdown, task }
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        // interval() panics on a zero period.
        let period = self.config.pull_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut retry_at: Option<Instant> = None;
        info!(owner = %self.config.owner, "Sync loop started");

        loop {
            let retry_deadline = retry_at.unwrap_or_else(Instant::now);
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    retry_at = self.after_attempt(self.sync_once().await, retry_at);
                }
                _ = self.push_requested.notified() => {
                    tokio::time::sleep(self.config.push_debounce).await;
                    retry_at = self.after_attempt(self.push().await.map(drop), retry_at);
                }
                _ = tokio::time::sleep_until(retry_deadline), if retry_at.is_some() => {
                    debug!("Retrying after backoff");
                    retry_at = self.after_attempt(self.sync_once().await, None);
                }
            }
        }

        info!(owner = %self.config.owner, "Sync loop stopped");
    }

    /// One scheduled attempt. Unsynced edits are pushed so the server can
    /// merge them with newer states; a clean copy is pulled.
    async fn sync_once(&self) -> SyncResult<()> {
        if self.has_pending_changes() {
            self.push().await.map(drop)
        } else {
            self.pull().await.map(drop)
        }
    }

    /// Schedules the next retry after a background attempt.
    fn after_attempt(&self, result: SyncResult<()>, scheduled: Option<Instant>) -> Option<Instant> {
        match result {
            Ok(()) => {
                self.retry_attempt.store(0, Ordering::SeqCst);
                None
            }
            Err(err) if err.is_retryable() => {
                if scheduled.is_some() {
                    return scheduled;
                }
                let attempt = self.retry_attempt.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                let delay = self.config.retry.delay_for_attempt(attempt);
                self.stats.write().retries += 1;
                debug!(attempt, ?delay, "Scheduling retry");
                Some(Instant::now() + delay)
            }
            Err(err) => {
                debug!(error = %err, "Not retrying");
                scheduled
            }
        }
    }

    fn try_guard(&self) -> Option<SyncGuard<'_>> {
        SyncGuard::acquire(&self.syncing, &self.sync_released)
    }

    /// Waits for any in-flight push or pull, then holds the guard.
    async fn exclusive(&self) -> SyncGuard<'_> {
        loop {
            // Register before trying so a release in between is not missed.
            let released = self.sync_released.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            if let Some(guard) = self.try_guard() {
                return guard;
            }
            released.await;
        }
    }

    async fn bounded<T>(&self, request: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        tokio::time::timeout(self.config.timeout, request)
            .await
            .map_err(|_| SyncError::Timeout)?
    }

    /// Adopts the server's answer to a push.
    ///
    /// Edits made after the push was sent are kept and stay pending; only
    /// the version and timestamp are taken from the server.
    fn adopt_pushed(&self, state: DocumentState, seq: u64) -> SyncResult<()> {
        let mut local = self.local.write();
        let next = match local.as_ref() {
            Some(doc) if self.edit_seq.load(Ordering::SeqCst) != seq => {
                debug!(version = state.version, "Edits made during push stay pending");
                CachedDocument {
                    owner_id: doc.owner_id.clone(),
                    data: doc.data.clone(),
                    version: state.version,
                    last_updated: state.last_updated,
                    pending_changes: true,
                }
            }
            _ => CachedDocument::from_state(self.config.owner.clone(), state),
        };
        self.cache.store(&next)?;
        *local = Some(next);
        Ok(())
    }

    fn replace_local(&self, doc: CachedDocument) -> SyncResult<()> {
        let mut local = self.local.write();
        self.cache.store(&doc)?;
        *local = Some(doc);
        Ok(())
    }

    fn mark_synced(&self, status: SyncStatus) {
        self.retry_attempt.store(0, Ordering::SeqCst);
        {
            let mut stats = self.stats.write();
            stats.last_sync_time = Some(Utc::now());
            stats.last_error = None;
        }
        self.set_status(status);
    }

    fn failed(&self, err: SyncError) -> SyncError {
        self.stats.write().last_error = Some(err.to_string());
        if err.is_retryable() {
            warn!(error = %err, "Server unreachable, keeping local changes");
            self.set_status(SyncStatus::Offline);
            self.emit(SyncEvent::Offline {
                error: err.to_string(),
            });
        } else {
            warn!(error = %err, "Sync request failed");
            self.set_status(SyncStatus::Error);
        }
        err
    }

    fn set_status(&self, status: SyncStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(?previous, ?status, "Sync status changed");
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Handle to a running background loop.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Returns true if the loop has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sync loop ended abnormally");
        }
    }
}
