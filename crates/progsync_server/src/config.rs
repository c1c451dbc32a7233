//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default tolerance under which a stale submission is treated as the same
/// logical update rather than a cross-session conflict.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(2000);

/// Default maximum difference in day count for an auto-mergeable pair.
pub const DEFAULT_MAX_DAY_DELTA: usize = 3;

/// Default maximum difference in item count for a paired day.
pub const DEFAULT_MAX_ITEM_DELTA: usize = 2;

/// Tunables of the version/timestamp protocol and the compatibility
/// heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Grace window for stale submissions.
    pub grace_window: Duration,
    /// Maximum day-count difference still considered compatible.
    pub max_day_delta: usize,
    /// Maximum per-day item-count difference still considered compatible.
    pub max_item_delta: usize,
    /// How often a submission is re-run after losing a compare-and-set race.
    pub max_write_attempts: u32,
}

impl SyncPolicy {
    /// Sets the grace window.
    pub fn with_grace_window(mut self, window: Duration) -> Self {
        self.grace_window = window;
        self
    }

    /// Sets the day-count threshold.
    pub fn with_max_day_delta(mut self, delta: usize) -> Self {
        self.max_day_delta = delta;
        self
    }

    /// Sets the item-count threshold.
    pub fn with_max_item_delta(mut self, delta: usize) -> Self {
        self.max_item_delta = delta;
        self
    }

    /// Sets the number of write attempts per submission.
    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    /// Grace window in whole milliseconds.
    pub fn grace_window_millis(&self) -> i64 {
        i64::try_from(self.grace_window.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
            max_day_delta: DEFAULT_MAX_DAY_DELTA,
            max_item_delta: DEFAULT_MAX_ITEM_DELTA,
            max_write_attempts: 3,
        }
    }
}

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Secret key for token validation. Bearer tokens are required
    /// whenever this is set.
    pub auth_secret: Option<Vec<u8>>,
    /// Lifetime of issued owner tokens.
    pub token_expiry: Duration,
    /// Directory for file-backed documents; in-memory when unset.
    pub data_dir: Option<PathBuf>,
    /// Sync protocol tunables.
    pub policy: SyncPolicy,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_body_bytes: 1024 * 1024,
            auth_secret: None,
            token_expiry: Duration::from_secs(24 * 60 * 60),
            data_dir: None,
            policy: SyncPolicy::default(),
        }
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Enables authentication with the given secret.
    pub fn with_auth(mut self, secret: Vec<u8>) -> Self {
        self.auth_secret = Some(secret);
        self
    }

    /// Returns true if bearer tokens are required.
    pub fn auth_enabled(&self) -> bool {
        self.auth_secret.is_some()
    }

    /// Sets the token lifetime.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Stores documents as files under `dir`.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the sync policy.
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}
