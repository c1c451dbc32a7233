//! # progsync storage
//!
//! Persistence seam for progress documents.
//!
//! A store keeps exactly one [`ProgressDocument`](progsync_model::ProgressDocument)
//! per owner. Stores do not interpret document content; the sync
//! coordinator owns all merge and versioning decisions.
//!
//! ## Design Principles
//!
//! - `get` lazily creates a seeded document, and that creation is a write
//! - `put` replaces days, version and timestamp together or not at all
//! - `put` is a compare-and-set on the stored version, which serializes
//!   writers for one owner
//! - Stores must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral servers
//! - [`FileStore`] - One JSON file per owner, locked across processes
//!
//! ## Example
//!
//! ```rust
//! use progsync_model::{OwnerId, SystemClock};
//! use progsync_storage::{DocumentStore, MemoryStore};
//! use std::sync::Arc;
//!
//! let store = MemoryStore::new(Arc::new(SystemClock));
//! let mut doc = store.get(&OwnerId::new("alice")).unwrap();
//! assert_eq!(doc.version, 1);
//!
//! doc.days[0].items[0].completed = true;
//! doc.version = 2;
//! store.put(&doc, 1).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::DocumentStore;
