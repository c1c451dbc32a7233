//! In-memory document store.

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use parking_lot::RwLock;
use progsync_model::{Clock, OwnerId, ProgressDocument};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// An in-memory document store.
///
/// Suitable for:
/// - Unit and integration tests
/// - Ephemeral servers that don't need persistence
///
/// # Thread Safety
///
/// The compare-and-set in [`DocumentStore::put`] runs under a single write
/// lock, so concurrent writers for one owner are serialized.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    documents: RwLock<HashMap<OwnerId, ProgressDocument>>,
}

impl MemoryStore {
    /// Creates an empty store that seeds documents using `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces a document without a version check.
    ///
    /// Intended for test setup and data import.
    pub fn insert(&self, document: ProgressDocument) {
        self.documents
            .write()
            .insert(document.owner_id.clone(), document);
    }

    /// Returns the stored document without seeding a missing one.
    pub fn peek(&self, owner: &OwnerId) -> Option<ProgressDocument> {
        self.documents.read().get(owner).cloned()
    }

    /// Returns the number of owners with a document.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if no documents exist.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, owner: &OwnerId) -> StoreResult<ProgressDocument> {
        if let Some(doc) = self.documents.read().get(owner) {
            return Ok(doc.clone());
        }

        let mut documents = self.documents.write();
        let doc = documents.entry(owner.clone()).or_insert_with(|| {
            debug!(owner = %owner, "created seeded progress document");
            ProgressDocument::seeded(owner.clone(), self.clock.now())
        });
        Ok(doc.clone())
    }

    fn put(&self, document: &ProgressDocument, expected_version: u64) -> StoreResult<()> {
        let mut documents = self.documents.write();
        let actual = documents
            .get(&document.owner_id)
            .map(|doc| doc.version)
            .unwrap_or(0);

        if actual != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual,
            });
        }

        documents.insert(document.owner_id.clone(), document.clone());
        Ok(())
    }
}
