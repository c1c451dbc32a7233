//! File-based document store.

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use fs2::FileExt;
use progsync_model::{Clock, OwnerId, ProgressDocument};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A file-based document store.
///
/// Each owner's document lives in `<dir>/<sha256(owner)>.json`. Writes go
/// to a temporary file that is synced and renamed over the old one, so a
/// crash leaves either the previous or the new document, never a torn one.
///
/// # Locking
///
/// Every `get` and `put` holds an exclusive advisory lock on
/// `<dir>/<sha256(owner)>.lock` for its duration. The compare-and-set in
/// `put` is therefore serialized across threads and processes.
///
/// # Example
///
/// ```no_run
/// use progsync_model::{OwnerId, SystemClock};
/// use progsync_storage::{DocumentStore, FileStore};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let store = FileStore::open(Path::new("data"), Arc::new(SystemClock)).unwrap();
/// let doc = store.get(&OwnerId::new("alice")).unwrap();
/// ```
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

/// Exclusive lock on one owner's lock file, released on drop.
struct OwnerLock {
    file: File,
}

impl Drop for OwnerLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            clock,
        })
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(owner: &OwnerId) -> String {
        hex::encode(Sha256::digest(owner.as_str().as_bytes()))
    }

    fn document_path(&self, owner: &OwnerId) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem(owner)))
    }

    fn lock(&self, owner: &OwnerId) -> StoreResult<OwnerLock> {
        let path = self.dir.join(format!("{}.lock", Self::file_stem(owner)));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(OwnerLock { file })
    }

    fn read(&self, owner: &OwnerId) -> StoreResult<Option<ProgressDocument>> {
        let path = self.document_path(owner);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let doc: ProgressDocument = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Corrupted(format!("{}: {}", path.display(), e))
        })?;

        if &doc.owner_id != owner {
            return Err(StoreError::Corrupted(format!(
                "{} belongs to owner {}",
                path.display(),
                doc.owner_id
            )));
        }

        Ok(Some(doc))
    }

    fn write(&self, document: &ProgressDocument) -> StoreResult<()> {
        let path = self.document_path(&document.owner_id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(document)?;

        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn get(&self, owner: &OwnerId) -> StoreResult<ProgressDocument> {
        let _lock = self.lock(owner)?;

        if let Some(doc) = self.read(owner)? {
            return Ok(doc);
        }

        let doc = ProgressDocument::seeded(owner.clone(), self.clock.now());
        self.write(&doc)?;
        debug!(owner = %owner, dir = %self.dir.display(), "created seeded progress document");
        Ok(doc)
    }

    fn put(&self, document: &ProgressDocument, expected_version: u64) -> StoreResult<()> {
        let _lock = self.lock(&document.owner_id)?;

        let actual = self
            .read(&document.owner_id)?
            .map(|doc| doc.version)
            .unwrap_or(0);

        if actual != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual,
            });
        }

        self.write(document)
    }
}
