//! Durable local copies of the document.
//!
//! The agent persists its copy after every local edit so a session that
//! restarts offline resumes with its unsynced edits.

use crate::error::SyncResult;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use progsync_model::{DaySnapshot, DocumentState, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The client's copy of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDocument {
    /// Owner of the document.
    pub owner_id: OwnerId,
    /// Local days, including unsynced edits.
    pub data: Vec<DaySnapshot>,
    /// Last server version this copy is based on.
    pub version: u64,
    /// Server timestamp of that version.
    pub last_updated: DateTime<Utc>,
    /// Whether `data` holds edits the server has not accepted yet.
    pub pending_changes: bool,
}

impl CachedDocument {
    /// A clean copy of a server state.
    pub fn from_state(owner_id: OwnerId, state: DocumentState) -> Self {
        Self {
            owner_id,
            data: state.data,
            version: state.version,
            last_updated: state.last_updated,
            pending_changes: false,
        }
    }
}

/// Durable storage for the local copy, keyed by owner.
pub trait LocalCache: Send + Sync {
    /// Loads the copy for an owner, if one was stored.
    fn load(&self, owner: &OwnerId) -> SyncResult<Option<CachedDocument>>;

    /// Stores a copy, replacing any previous one for the same owner.
    fn store(&self, doc: &CachedDocument) -> SyncResult<()>;

    /// Removes the copy for an owner.
    fn clear(&self, owner: &OwnerId) -> SyncResult<()>;
}

/// In-memory cache for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    docs: RwLock<HashMap<OwnerId, CachedDocument>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn load(&self, owner: &OwnerId) -> SyncResult<Option<CachedDocument>> {
        Ok(self.docs.read().get(owner).cloned())
    }

    fn store(&self, doc: &CachedDocument) -> SyncResult<()> {
        self.docs.write().insert(doc.owner_id.clone(), doc.clone());
        Ok(())
    }

    fn clear(&self, owner: &OwnerId) -> SyncResult<()> {
        self.docs.write().remove(owner);
        Ok(())
    }
}

/// One JSON file per owner in a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash mid-write leaves the previous copy intact.
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Opens a cache directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> SyncResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, owner: &OwnerId) -> PathBuf {
        // Owner ids are opaque; hex keeps them filesystem-safe.
        self.dir
            .join(format!("{}.json", hex::encode(owner.as_str())))
    }
}

impl LocalCache for FileCache {
    fn load(&self, owner: &OwnerId) -> SyncResult<Option<CachedDocument>> {
        let path = self.path_for(owner);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn store(&self, doc: &CachedDocument) -> SyncResult<()> {
        let path = self.path_for(&doc.owner_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear(&self, owner: &OwnerId) -> SyncResult<()> {
        let path = self.path_for(owner);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample(owner: &str, pending: bool) -> CachedDocument {
        CachedDocument {
            owner_id: OwnerId::new(owner),
            data: vec![DaySnapshot::new(1, "2024-01-01")],
            version: 4,
            last_updated: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            pending_changes: pending,
        }
    }

    #[test]
    fn memory_cache_round_trip() {
        let cache = MemoryCache::new();
        let owner = OwnerId::new("alice");
        assert!(cache.load(&owner).unwrap().is_none());

        cache.store(&sample("alice", true)).unwrap();
        assert_eq!(cache.load(&owner).unwrap(), Some(sample("alice", true)));

        cache.clear(&owner).unwrap();
        assert!(cache.load(&owner).unwrap().is_none());
    }

    #[test]
    fn file_cache_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let cache = FileCache::open(temp.path()).unwrap();
            cache.store(&sample("alice", true)).unwrap();
            cache.store(&sample("bob/../x", false)).unwrap();
        }

        let cache = FileCache::open(temp.path()).unwrap();
        let alice = cache.load(&OwnerId::new("alice")).unwrap().unwrap();
        assert!(alice.pending_changes);
        assert_eq!(alice.version, 4);

        let odd = cache.load(&OwnerId::new("bob/../x")).unwrap().unwrap();
        assert!(!odd.pending_changes);
        assert!(cache.dir().join(format!("{}.json", hex::encode("bob/../x"))).exists());
    }

    #[test]
    fn file_cache_overwrites_and_clears() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::open(temp.path()).unwrap();
        let owner = OwnerId::new("carol");

        cache.store(&sample("carol", true)).unwrap();
        let mut next = sample("carol", false);
        next.version = 5;
        cache.store(&next).unwrap();
        assert_eq!(cache.load(&owner).unwrap().unwrap().version, 5);

        cache.clear(&owner).unwrap();
        cache.clear(&owner).unwrap();
        assert!(cache.load(&owner).unwrap().is_none());
    }

    #[test]
    fn corrupted_file_is_a_cache_error() {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::open(temp.path()).unwrap();
        let owner = OwnerId::new("dave");
        fs::write(cache.path_for(&owner), b"not json").unwrap();

        let err = cache.load(&owner).unwrap_err();
        assert!(matches!(err, crate::SyncError::Cache(_)));
    }
}
