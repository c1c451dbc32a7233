//! Test fixtures and store helpers.
//!
//! Provides a deterministic clock, builders for days, and stores wired to
//! that clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use progsync_model::{DaySnapshot, Difficulty, Item, Link, OwnerId, Tag};
use progsync_storage::{FileStore, MemoryStore};
use std::sync::Arc;
use tempfile::TempDir;

pub use progsync_model::ManualClock;

/// The instant every fixture clock starts at: 2024-01-01T09:00:00Z.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A manual clock starting at [`epoch`].
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

/// Date string of a day number, counting from [`epoch`] as day 1.
pub fn date_for(day_number: i64) -> String {
    (epoch() + Duration::days(day_number - 1))
        .format("%Y-%m-%d")
        .to_string()
}

/// Shorthand for an owner id.
pub fn owner(id: &str) -> OwnerId {
    OwnerId::new(id)
}

/// Builds days with `(day_number, item_count)` shapes.
///
/// Item ids are `d<day>-i<index>`.
pub fn days(shape: &[(i64, usize)]) -> Vec<DaySnapshot> {
    shape
        .iter()
        .map(|&(number, items)| {
            (0..items)
                .fold(DayBuilder::new(number), |builder, i| {
                    builder.item(format!("d{number}-i{i}"), format!("Task {i}"))
                })
                .build()
        })
        .collect()
}

/// Builder for a [`DaySnapshot`].
#[derive(Debug, Clone)]
pub struct DayBuilder {
    day: DaySnapshot,
}

impl DayBuilder {
    /// Starts an empty day dated by [`date_for`].
    pub fn new(day_number: i64) -> Self {
        Self {
            day: DaySnapshot::new(day_number, date_for(day_number)),
        }
    }

    /// Adds an open item of easy difficulty.
    pub fn item(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.day.items.push(Item::new(id, text, Difficulty::Easy));
        self
    }

    /// Adds a completed item of easy difficulty.
    pub fn completed(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut item = Item::new(id, text, Difficulty::Easy);
        item.completed = true;
        self.day.items.push(item);
        self
    }

    /// Adds an arbitrary item.
    pub fn with_item(mut self, item: Item) -> Self {
        self.day.items.push(item);
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, text: impl Into<String>, color: impl Into<String>) -> Self {
        self.day.tags.push(Tag::new(text, color));
        self
    }

    /// Adds a link.
    pub fn link(mut self, url: impl Into<String>, display_text: impl Into<String>) -> Self {
        self.day.links.push(Link::new(url, display_text));
        self
    }

    /// Finishes the day.
    pub fn build(self) -> DaySnapshot {
        self.day
    }
}

/// An in-memory store sharing a manual clock with the test.
pub struct TestStore {
    /// The store.
    pub store: Arc<MemoryStore>,
    /// The clock used for seeding.
    pub clock: Arc<ManualClock>,
}

impl TestStore {
    /// Creates an empty in-memory store at [`epoch`].
    pub fn memory() -> Self {
        let clock = manual_clock();
        let store = Arc::new(MemoryStore::new(clock.clone()));
        Self { store, clock }
    }
}

/// A file store in a temporary directory with automatic cleanup.
pub struct TestFileStore {
    /// The store.
    pub store: Arc<FileStore>,
    /// The clock used for seeding.
    pub clock: Arc<ManualClock>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestFileStore {
    /// Creates an empty file store at [`epoch`].
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = manual_clock();
        let store = FileStore::open(temp_dir.path(), clock.clone())
            .expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            clock,
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TestFileStore {
    fn default() -> Self {
        Self::new()
    }
}
