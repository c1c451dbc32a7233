//! # progsync Server
//!
//! Authoritative HTTP sync server for progress documents.
//!
//! This crate provides:
//! - The version/timestamp protocol ([`SyncCoordinator`])
//! - The compatibility heuristic ([`CompatibilityClassifier`])
//! - The field-wise merge ([`merge`])
//! - Owner authentication (HMAC-SHA256 tokens)
//! - HTTP endpoints over axum ([`router`], [`serve`])
//!
//! # Protocol
//!
//! A client submits its days together with the version and timestamp it
//! last saw:
//! 1. Submissions without version information are accepted outright
//! 2. A submission is stale when the server timestamp is more than the
//!    grace window ahead of the client's and the client version is lower
//! 3. Fresh or barely-stale submissions are accepted outright
//! 4. Stale submissions are merged if the classifier deems them
//!    compatible, and returned as a conflict otherwise
//!
//! Every accepted write bumps the version by one. A conflict changes
//! nothing; the user resolves it by adopting the server state or by
//! force-pushing the local one.
//!
//! # Authentication
//!
//! Authentication is optional but recommended for production:
//!
//! ```rust
//! use progsync_model::OwnerId;
//! use progsync_server::{ServerConfig, SyncServer};
//!
//! let secret = b"my-secure-secret-32-bytes-long!".to_vec();
//! let server = SyncServer::new(ServerConfig::default().with_auth(secret));
//!
//! // Issue tokens for owners
//! let token = server.issue_token(&OwnerId::new("alice")).unwrap();
//! assert_eq!(server.authenticate(Some(&token), None).unwrap().as_str(), "alice");
//! ```
//!
//! Without a secret the owner is taken from the `X-Owner-Id` header, which
//! is only suitable for local use.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod classifier;
mod config;
mod coordinator;
mod error;
mod http;
mod merge;
mod server;

pub use auth::{AuthConfig, TokenValidator};
pub use classifier::{Compatibility, CompatibilityClassifier, Incompatibility};
pub use config::{
    ServerConfig, SyncPolicy, DEFAULT_GRACE_WINDOW, DEFAULT_MAX_DAY_DELTA, DEFAULT_MAX_ITEM_DELTA,
};
pub use coordinator::{AcceptPath, SubmitOutcome, SyncCoordinator};
pub use error::{ServerError, ServerResult};
pub use http::{router, serve, VerifiedOwner, OWNER_HEADER};
pub use merge::{merge, MergeError};
pub use server::SyncServer;
