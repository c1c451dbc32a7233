//! Document store trait definition.

use crate::error::StoreResult;
use progsync_model::{OwnerId, ProgressDocument};
use std::sync::Arc;

/// Persistence for one progress document per owner.
///
/// # Invariants
///
/// - `get` never fails for a missing owner: it creates, persists and
///   returns a seeded document (version 1)
/// - `put` writes days, version and timestamp as one unit
/// - `put` succeeds only if the stored version equals `expected_version`;
///   otherwise it returns [`crate::StoreError::VersionMismatch`] and writes
///   nothing
/// - Stores must be `Send + Sync`
///
/// The sync coordinator relies on the compare-and-set to keep two
/// get-then-put sequences for the same owner from interleaving. It provides
/// no locking of its own.
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait DocumentStore: Send + Sync {
    /// Returns the owner's document, creating a seeded one on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read, or if creating the
    /// seeded document fails.
    fn get(&self, owner: &OwnerId) -> StoreResult<ProgressDocument>;

    /// Replaces the owner's document if its stored version is
    /// `expected_version`.
    ///
    /// The owner is taken from `document.owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::VersionMismatch`] if another write landed
    /// first, or an I/O error.
    fn put(&self, document: &ProgressDocument, expected_version: u64) -> StoreResult<()>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn get(&self, owner: &OwnerId) -> StoreResult<ProgressDocument> {
        (**self).get(owner)
    }

    fn put(&self, document: &ProgressDocument, expected_version: u64) -> StoreResult<()> {
        (**self).put(document, expected_version)
    }
}
