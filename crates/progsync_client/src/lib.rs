//! # progsync Client
//!
//! Client-side synchronization for progress documents.
//!
//! This crate provides:
//! - The per-session sync agent ([`ClientSyncAgent`])
//! - Durable local caches ([`FileCache`], [`MemoryCache`])
//! - A transport abstraction with an HTTP implementation over reqwest
//! - Retry and backoff configuration
//!
//! # Sync model
//!
//! Edits are applied to a local copy, persisted, and pushed in the
//! background together with the version they are based on:
//! 1. An accepted push adopts the server's new state
//! 2. A refused push becomes a pending conflict the user resolves by
//!    adopting the server state or force-pushing the local one
//! 3. A pull adopts any newer server state wholesale
//! 4. Network failures put the agent offline; edits stay pending and the
//!    background loop retries with backoff
//!
//! # Example
//!
//! ```rust,no_run
//! use progsync_client::{ClientConfig, ClientSyncAgent, FileCache, HttpTransport, Identity};
//! use progsync_model::{Edit, OwnerId};
//! use std::sync::Arc;
//!
//! # async fn run() -> progsync_client::SyncResult<()> {
//! let owner = OwnerId::new("alice");
//! let transport = HttpTransport::new("http://localhost:8080", Identity::Owner(owner.clone()));
//! let cache = FileCache::open("./progsync-cache")?;
//!
//! let agent = Arc::new(ClientSyncAgent::new(
//!     ClientConfig::new(owner),
//!     Arc::new(transport),
//!     Arc::new(cache),
//! ));
//! agent.bootstrap()?;
//! let handle = agent.spawn();
//!
//! agent.apply(&Edit::ToggleItem { day: 1, item_id: "a1".into() })?;
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod agent;
mod cache;
mod config;
mod error;
mod http;
mod state;
mod transport;

pub use agent::{ClientSyncAgent, PullOutcome, PushOutcome, SyncHandle};
pub use cache::{CachedDocument, FileCache, LocalCache, MemoryCache};
pub use config::{ClientConfig, RetryConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpTransport, Identity, OWNER_HEADER};
pub use state::{SyncEvent, SyncStats, SyncStatus};
pub use transport::{MockTransport, SubmitReply, SyncTransport};
