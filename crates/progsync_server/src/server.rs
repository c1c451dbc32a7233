//! Main sync server.

use crate::auth::{AuthConfig, TokenValidator};
use crate::config::ServerConfig;
use crate::coordinator::{SubmitOutcome, SyncCoordinator};
use crate::error::{ServerError, ServerResult};
use progsync_model::{
    Clock, DocumentState, ForcePushRequest, HealthResponse, OwnerId, SubmitRequest, SystemClock,
};
use progsync_storage::{DocumentStore, FileStore, MemoryStore};
use std::sync::Arc;

/// The sync server.
///
/// This server owns the coordinator and the owner authentication. Each
/// `handle_*` method corresponds to one HTTP endpoint; [`crate::router`]
/// exposes them over axum, and tests may call them directly.
///
/// Handlers do blocking store I/O. Async callers should run them on a
/// blocking thread.
///
/// # Example
///
/// ```
/// use progsync_model::{OwnerId, SubmitRequest};
/// use progsync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let owner = OwnerId::new("alice");
///
/// let mut state = server.handle_get(&owner).unwrap();
/// state.data[0].items[0].completed = true;
///
/// let request = SubmitRequest::new(state.data, state.version, state.last_updated);
/// let outcome = server.handle_submit(&owner, request).unwrap();
/// assert_eq!(outcome.accepted().unwrap().version, 2);
/// ```
pub struct SyncServer {
    config: ServerConfig,
    coordinator: SyncCoordinator,
    validator: Option<TokenValidator>,
}

impl SyncServer {
    /// Creates a server backed by an in-memory store.
    pub fn new(config: ServerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::new(Arc::clone(&clock)));
        Self::with_store(config, store, clock)
    }

    /// Creates a server backed by the store the config asks for: files
    /// under `data_dir` if set, memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn DocumentStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::open(dir, Arc::clone(&clock))?),
            None => Arc::new(MemoryStore::new(Arc::clone(&clock))),
        };
        Ok(Self::with_store(config, store, clock))
    }

    /// Creates a server over an existing store and clock.
    pub fn with_store(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let validator = config.auth_secret.as_ref().map(|secret| {
            TokenValidator::new(AuthConfig::new(secret.clone()).with_expiry(config.token_expiry))
        });
        let coordinator = SyncCoordinator::new(store, clock, config.policy.clone());

        Self {
            config,
            coordinator,
            validator,
        }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Returns true if bearer tokens are required.
    pub fn auth_enabled(&self) -> bool {
        self.validator.is_some()
    }

    /// Issues a token for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRequest`] when authentication is
    /// disabled.
    pub fn issue_token(&self, owner: &OwnerId) -> ServerResult<String> {
        match &self.validator {
            Some(validator) => validator.create_token(owner),
            None => Err(ServerError::InvalidRequest(
                "authentication is disabled".into(),
            )),
        }
    }

    /// Resolves the verified owner of a request.
    ///
    /// With authentication enabled only the bearer token counts. Without
    /// it, the owner header names the owner directly.
    pub fn authenticate(
        &self,
        bearer: Option<&str>,
        owner_header: Option<&str>,
    ) -> ServerResult<OwnerId> {
        match &self.validator {
            Some(validator) => {
                let token = bearer.ok_or_else(|| {
                    ServerError::AuthenticationFailed("missing bearer token".into())
                })?;
                validator.validate_token(token.trim())
            }
            None => owner_header
                .map(str::trim)
                .filter(|owner| !owner.is_empty())
                .map(OwnerId::new)
                .ok_or_else(|| ServerError::AuthenticationFailed("missing owner id".into())),
        }
    }

    /// Handles `GET /document`.
    pub fn handle_get(&self, owner: &OwnerId) -> ServerResult<DocumentState> {
        self.coordinator.current(owner)
    }

    /// Handles `POST /document`.
    pub fn handle_submit(
        &self,
        owner: &OwnerId,
        request: SubmitRequest,
    ) -> ServerResult<SubmitOutcome> {
        self.coordinator.submit(owner, request)
    }

    /// Handles `POST /document/force-push`.
    pub fn handle_force_push(
        &self,
        owner: &OwnerId,
        request: ForcePushRequest,
    ) -> ServerResult<DocumentState> {
        self.coordinator.force_submit(owner, request.data)
    }

    /// Handles `POST /document/force-sync`.
    pub fn handle_force_sync(&self, owner: &OwnerId) -> ServerResult<DocumentState> {
        self.coordinator.current(owner)
    }

    /// Handles `GET /health`.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            auth_enabled: self.auth_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progsync_model::DaySnapshot;
    use tempfile::tempdir;

    #[test]
    fn server_lifecycle() {
        let server = SyncServer::new(ServerConfig::default());
        assert!(!server.auth_enabled());
        assert!(server.health().healthy);

        let owner = OwnerId::new("alice");
        let state = server.handle_get(&owner).unwrap();
        assert_eq!(state.version, 1);
        assert_eq!(server.handle_force_sync(&owner).unwrap(), state);
    }

    #[test]
    fn full_sync_flow() {
        let server = SyncServer::new(ServerConfig::default());
        let owner = OwnerId::new("alice");

        let mut state = server.handle_get(&owner).unwrap();
        state.data[0].items[1].completed = true;
        let outcome = server
            .handle_submit(
                &owner,
                SubmitRequest::new(state.data.clone(), state.version, state.last_updated),
            )
            .unwrap();
        let accepted = outcome.accepted().unwrap().clone();
        assert_eq!(accepted.version, 2);

        let forced = server
            .handle_force_push(&owner, ForcePushRequest::new(vec![DaySnapshot::new(9, "x")]))
            .unwrap();
        assert_eq!(forced.version, 3);
        assert_eq!(server.handle_get(&owner).unwrap(), forced);
    }

    #[test]
    fn owner_header_identifies_without_auth() {
        let server = SyncServer::new(ServerConfig::default());
        assert_eq!(
            server.authenticate(None, Some(" bob ")).unwrap(),
            OwnerId::new("bob")
        );
        assert!(matches!(
            server.authenticate(None, Some("  ")),
            Err(ServerError::AuthenticationFailed(_))
        ));
        assert!(server.authenticate(None, None).is_err());
        assert!(server.issue_token(&OwnerId::new("bob")).is_err());
    }

    #[test]
    fn bearer_token_required_with_auth() {
        let server = SyncServer::new(ServerConfig::default().with_auth(b"secret".to_vec()));
        assert!(server.auth_enabled());
        assert!(server.health().auth_enabled);

        let owner = OwnerId::new("carol");
        let token = server.issue_token(&owner).unwrap();
        assert_eq!(server.authenticate(Some(&token), None).unwrap(), owner);

        // The owner header is ignored once tokens are required.
        assert!(server.authenticate(None, Some("carol")).is_err());
        assert!(server.authenticate(Some("carol.1.00"), None).is_err());
    }

    #[test]
    fn secret_set_without_builder_still_requires_tokens() {
        let config = ServerConfig {
            auth_secret: Some(b"secret".to_vec()),
            ..ServerConfig::default()
        };
        let server = SyncServer::new(config);

        assert!(server.auth_enabled());
        assert!(matches!(
            server.authenticate(None, Some("mallory")),
            Err(ServerError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn open_uses_data_dir() {
        let dir = tempdir().unwrap();
        let owner = OwnerId::new("dave");

        {
            let server = SyncServer::open(ServerConfig::default().with_data_dir(dir.path())).unwrap();
            server
                .handle_force_push(&owner, ForcePushRequest::new(Vec::new()))
                .unwrap();
        }

        let server = SyncServer::open(ServerConfig::default().with_data_dir(dir.path())).unwrap();
        let state = server.handle_get(&owner).unwrap();
        assert_eq!(state.version, 2);
        assert!(state.data.is_empty());
    }
}
