//! Sync agents against a real sync server, in-process and over HTTP.

use async_trait::async_trait;
use progsync_client::{
    ClientConfig, ClientSyncAgent, FileCache, HttpTransport, Identity, MemoryCache, PullOutcome,
    PushOutcome, RetryConfig, SubmitReply, SyncError, SyncResult, SyncStatus, SyncTransport,
};
use progsync_model::{
    DocumentState, Edit, ForcePushRequest, OwnerId, Resolution, SubmitRequest, Tag,
};
use progsync_server::{serve, ServerConfig, ServerError, SubmitOutcome, SyncServer};
use progsync_testkit::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Calls the server facade directly, with a switch to simulate going offline.
struct InProcessTransport {
    server: Arc<SyncServer>,
    owner: OwnerId,
    online: AtomicBool,
}

impl InProcessTransport {
    fn new(server: Arc<SyncServer>, owner: &str) -> Arc<Self> {
        Arc::new(Self {
            server,
            owner: OwnerId::new(owner),
            online: AtomicBool::new(true),
        })
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn reachable(&self) -> SyncResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::transport_retryable("offline"))
        }
    }
}

fn server_failure(err: ServerError) -> SyncError {
    SyncError::Server {
        status: 500,
        message: err.to_string(),
    }
}

#[async_trait]
impl SyncTransport for InProcessTransport {
    async fn fetch(&self) -> SyncResult<DocumentState> {
        self.reachable()?;
        self.server.handle_get(&self.owner).map_err(server_failure)
    }

    async fn submit(&self, request: &SubmitRequest) -> SyncResult<SubmitReply> {
        self.reachable()?;
        match self
            .server
            .handle_submit(&self.owner, request.clone())
            .map_err(server_failure)?
        {
            SubmitOutcome::Accepted { state, .. } => Ok(SubmitReply::Accepted(state)),
            SubmitOutcome::Conflict(payload) => Ok(SubmitReply::Conflict(payload)),
        }
    }

    async fn force_push(&self, request: &ForcePushRequest) -> SyncResult<DocumentState> {
        self.reachable()?;
        self.server
            .handle_force_push(&self.owner, request.clone())
            .map_err(server_failure)
    }

    async fn force_sync(&self) -> SyncResult<DocumentState> {
        self.reachable()?;
        self.server
            .handle_force_sync(&self.owner)
            .map_err(server_failure)
    }
}

struct World {
    server: Arc<SyncServer>,
    fixture: TestStore,
}

impl World {
    fn new() -> Self {
        let fixture = TestStore::memory();
        let server = Arc::new(SyncServer::with_store(
            ServerConfig::default(),
            fixture.store.clone(),
            fixture.clock.clone(),
        ));
        Self { server, fixture }
    }

    fn session(&self, owner: &str) -> (Arc<ClientSyncAgent>, Arc<InProcessTransport>) {
        self.session_with(ClientConfig::new(OwnerId::new(owner)))
    }

    fn session_with(
        &self,
        config: ClientConfig,
    ) -> (Arc<ClientSyncAgent>, Arc<InProcessTransport>) {
        let transport = InProcessTransport::new(self.server.clone(), config.owner.as_str());
        let agent = Arc::new(ClientSyncAgent::new(
            config,
            transport.clone(),
            Arc::new(MemoryCache::new()),
        ));
        (agent, transport)
    }
}

fn toggle(day: i64, item_id: &str) -> Edit {
    Edit::ToggleItem {
        day,
        item_id: item_id.to_string(),
    }
}

fn seeded_item(agent: &ClientSyncAgent, index: usize) -> String {
    agent.document().unwrap().data[0].items[index].id.clone()
}

async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn sessions_converge_through_the_server() {
    let world = World::new();
    let (a, _) = world.session("alice");
    let (b, _) = world.session("alice");
    a.pull().await.unwrap();
    b.pull().await.unwrap();

    let item = seeded_item(&a, 0);
    a.apply(&toggle(1, &item)).unwrap();
    world.fixture.clock.advance_millis(500);
    assert_eq!(a.push().await.unwrap(), PushOutcome::Synced(2));

    assert_eq!(
        b.pull().await.unwrap(),
        PullOutcome::Updated {
            version: 2,
            discarded_local_changes: false
        }
    );
    assert_eq!(b.document().unwrap().data, a.document().unwrap().data);
}

#[tokio::test]
async fn stale_compatible_push_is_merged() {
    let world = World::new();
    let (a, _) = world.session("alice");
    let (b, b_link) = world.session("alice");
    a.pull().await.unwrap();
    b.pull().await.unwrap();

    // B edits while offline.
    b_link.set_online(false);
    let item = seeded_item(&b, 1);
    b.apply(&toggle(1, &item)).unwrap();
    assert!(b.push().await.is_err());
    assert_eq!(b.status(), SyncStatus::Offline);

    // A tags the day an hour later.
    world.fixture.clock.advance_millis(60 * 60 * 1000);
    a.mutate(|days| {
        days[0].tags.push(Tag::new("focus", "#aa3300"));
        Ok(())
    })
    .unwrap();
    assert_eq!(a.push().await.unwrap(), PushOutcome::Synced(2));

    // B reconnects; its push is stale but compatible.
    b_link.set_online(true);
    assert_eq!(b.push().await.unwrap(), PushOutcome::Synced(3));

    let merged = b.document().unwrap();
    assert!(merged.data[0].has_tag("focus"));
    assert!(merged.data[0].items[1].completed);
    assert!(!merged.pending_changes);

    assert_eq!(
        a.pull().await.unwrap(),
        PullOutcome::Updated {
            version: 3,
            discarded_local_changes: false
        }
    );
}

#[tokio::test]
async fn background_loop_merges_offline_edit_after_reconnect() {
    let world = World::new();
    let (a, _) = world.session("alice");
    let (b, b_link) = world.session_with(
        ClientConfig::new(OwnerId::new("alice"))
            .with_pull_interval(Duration::from_secs(3600))
            .with_push_debounce(Duration::from_millis(10))
            .with_retry(
                RetryConfig::new()
                    .with_initial_delay(Duration::from_millis(50))
                    .with_max_delay(Duration::from_millis(100)),
            ),
    );
    a.pull().await.unwrap();
    b.pull().await.unwrap();
    let handle = b.spawn();

    // B edits offline; the debounced push fails.
    b_link.set_online(false);
    let item = seeded_item(&b, 1);
    b.apply(&toggle(1, &item)).unwrap();
    eventually(|| b.status() == SyncStatus::Offline).await;

    // A tags the day an hour later.
    world.fixture.clock.advance_millis(60 * 60 * 1000);
    a.mutate(|days| {
        days[0].tags.push(Tag::new("focus", "#aa3300"));
        Ok(())
    })
    .unwrap();
    assert_eq!(a.push().await.unwrap(), PushOutcome::Synced(2));

    // The loop's own retry reaches the server.
    b_link.set_online(true);
    eventually(|| !b.has_pending_changes()).await;
    handle.shutdown().await;

    let stored = world.server.handle_get(&owner("alice")).unwrap();
    assert_eq!(stored.version, 3);
    assert!(stored.data[0].has_tag("focus"));
    assert!(stored.data[0].items[1].completed);
    assert_eq!(b.document().unwrap().data, stored.data);
    assert!(b.pending_conflict().is_none());
}

#[tokio::test]
async fn incompatible_push_conflicts_until_kept_local() {
    let world = World::new();
    let (a, _) = world.session("alice");
    let (b, _) = world.session("alice");
    a.pull().await.unwrap();
    b.pull().await.unwrap();

    world.fixture.clock.advance_millis(60 * 60 * 1000);
    a.mutate(|days| {
        let shape = progsync_testkit::fixtures::days(&[(2, 1), (3, 1), (4, 1), (5, 1), (6, 1)]);
        days.extend(shape);
        Ok(())
    })
    .unwrap();
    assert_eq!(a.push().await.unwrap(), PushOutcome::Synced(2));

    let item = seeded_item(&b, 2);
    b.apply(&toggle(1, &item)).unwrap();
    let conflict = match b.push().await.unwrap() {
        PushOutcome::Conflict(conflict) => conflict,
        other => panic!("expected conflict, got {other:?}"),
    };
    assert_eq!(conflict.server_version, 2);
    assert_eq!(conflict.server_data.len(), 6);
    assert_eq!(world.server.handle_get(&owner("alice")).unwrap().version, 2);

    let local = b.document().unwrap().data;
    let forced = b.resolve_conflict(Resolution::KeepLocal).await.unwrap();
    assert_eq!(forced.version, 3);
    assert_eq!(forced.data, local);

    let stored = world.server.handle_get(&owner("alice")).unwrap();
    assert_eq!(stored, forced);
}

#[tokio::test]
async fn use_server_resolution_discards_local_edits() {
    let world = World::new();
    let (a, _) = world.session("alice");
    let (b, _) = world.session("alice");
    a.pull().await.unwrap();
    b.pull().await.unwrap();

    world.fixture.clock.advance_millis(60 * 60 * 1000);
    let item = seeded_item(&a, 0);
    a.apply(&toggle(1, &item)).unwrap();
    assert_eq!(a.push().await.unwrap(), PushOutcome::Synced(2));
    let server_days = a.document().unwrap().data;

    // Five extra items on day 1 exceed the item threshold.
    b.mutate(|days| {
        for i in 0..5 {
            days[0].items.push(progsync_model::Item::new(
                format!("extra-{i}"),
                "Extra",
                progsync_model::Difficulty::Hard,
            ));
        }
        Ok(())
    })
    .unwrap();
    assert!(matches!(
        b.push().await.unwrap(),
        PushOutcome::Conflict(_)
    ));

    let adopted = b.resolve_conflict(Resolution::UseServer).await.unwrap();
    assert_eq!(adopted.version, 2);
    assert_eq!(adopted.data, server_days);
    assert_eq!(b.document().unwrap().data, server_days);
    assert!(!b.has_pending_changes());
    assert_eq!(world.server.handle_get(&owner("alice")).unwrap().version, 2);
}

#[tokio::test]
async fn restarted_session_resumes_unsynced_edits() {
    let world = World::new();
    let cache_dir = TempDir::new().unwrap();
    let transport = InProcessTransport::new(world.server.clone(), "alice");

    {
        let agent = ClientSyncAgent::new(
            ClientConfig::new(OwnerId::new("alice")),
            transport.clone(),
            Arc::new(FileCache::open(cache_dir.path()).unwrap()),
        );
        agent.pull().await.unwrap();
        transport.set_online(false);
        let item = seeded_item(&agent, 0);
        agent.apply(&toggle(1, &item)).unwrap();
    }

    transport.set_online(true);
    world.fixture.clock.advance_millis(300);
    let agent = ClientSyncAgent::new(
        ClientConfig::new(OwnerId::new("alice")),
        transport.clone(),
        Arc::new(FileCache::open(cache_dir.path()).unwrap()),
    );
    assert!(agent.bootstrap().unwrap());
    assert!(agent.has_pending_changes());

    assert_eq!(
        agent.pull().await.unwrap(),
        PullOutcome::Pushed(PushOutcome::Synced(2))
    );
    let stored = world.server.handle_get(&owner("alice")).unwrap();
    assert!(stored.data[0].items[0].completed);
}

struct Running {
    base: String,
    server: Arc<SyncServer>,
    fixture: TestStore,
    _shutdown: oneshot::Sender<()>,
}

async fn start(config: ServerConfig) -> Running {
    let fixture = TestStore::memory();
    let server = Arc::new(SyncServer::with_store(
        config,
        fixture.store.clone(),
        fixture.clock.clone(),
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(serve(server.clone(), listener, async move {
        let _ = rx.await;
    }));

    Running {
        base: format!("http://{addr}"),
        server,
        fixture,
        _shutdown: tx,
    }
}

fn http_agent(base: &str, owner: &str, identity: Identity) -> ClientSyncAgent {
    ClientSyncAgent::new(
        ClientConfig::new(OwnerId::new(owner)).with_timeout(Duration::from_secs(5)),
        Arc::new(HttpTransport::new(base, identity)),
        Arc::new(MemoryCache::new()),
    )
}

#[tokio::test]
async fn http_round_trip_and_conflict() {
    let running = start(ServerConfig::default()).await;
    let agent = http_agent(
        &running.base,
        "alice",
        Identity::Owner(OwnerId::new("alice")),
    );

    agent.pull().await.unwrap();
    let item = seeded_item(&agent, 0);
    agent.apply(&toggle(1, &item)).unwrap();
    running.fixture.clock.advance_millis(200);
    assert_eq!(agent.push().await.unwrap(), PushOutcome::Synced(2));

    // Another session replaces the document an hour later.
    running.fixture.clock.advance_millis(60 * 60 * 1000);
    running
        .server
        .handle_force_push(
            &owner("alice"),
            ForcePushRequest::new(progsync_testkit::fixtures::days(&[
                (1, 1),
                (2, 1),
                (3, 1),
                (4, 1),
                (5, 1),
                (6, 1),
            ])),
        )
        .unwrap();

    agent.apply(&toggle(1, &item)).unwrap();
    assert!(matches!(
        agent.push().await.unwrap(),
        PushOutcome::Conflict(_)
    ));
    assert_eq!(agent.status(), SyncStatus::Conflict);

    let forced = agent.resolve_conflict(Resolution::KeepLocal).await.unwrap();
    assert_eq!(forced.version, 4);
    assert_eq!(forced.data.len(), 1);
    assert_eq!(
        running.server.handle_get(&owner("alice")).unwrap(),
        forced
    );

    let refreshed = agent.force_sync().await.unwrap();
    assert_eq!(refreshed, forced);
}

#[tokio::test]
async fn http_bearer_identity() {
    let running = start(ServerConfig::default().with_auth(b"client-test-secret".to_vec())).await;
    let token = running.server.issue_token(&owner("bob")).unwrap();

    let agent = http_agent(&running.base, "bob", Identity::Bearer(token));
    assert_eq!(
        agent.pull().await.unwrap(),
        PullOutcome::Updated {
            version: 1,
            discarded_local_changes: false
        }
    );

    let intruder = http_agent(
        &running.base,
        "bob",
        Identity::Owner(OwnerId::new("bob")),
    );
    let err = intruder.pull().await.unwrap_err();
    assert!(matches!(err, SyncError::AuthenticationFailed(_)));
    assert!(!err.is_retryable());
    assert_eq!(intruder.status(), SyncStatus::Error);
}
