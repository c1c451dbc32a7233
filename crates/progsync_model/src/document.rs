//! The progress document and its parts.

use crate::error::{ModelError, ModelResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identity under which exactly one progress document is scoped.
///
/// Owner ids are supplied by the identity-verification collaborator; this
/// crate never issues them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wraps a verified owner identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How hard a checklist item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    /// Easy.
    #[default]
    Easy,
    /// Medium.
    Medium,
    /// Hard.
    Hard,
}

/// A checklist item within a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item identifier, unique within its day.
    pub id: String,
    /// Display text.
    pub text: String,
    /// Optional reference link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Whether the item is checked off.
    #[serde(default)]
    pub completed: bool,
    /// Difficulty rating.
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Item {
    /// Creates an uncompleted item.
    pub fn new(id: impl Into<String>, text: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            link: None,
            completed: false,
            difficulty,
        }
    }

    /// Attaches a reference link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// A tag, identified by its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag text (identity).
    pub text: String,
    /// Display color.
    pub color: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: color.into(),
        }
    }
}

/// A link, identified by its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Target URL (identity).
    pub url: String,
    /// Text shown instead of the URL.
    pub display_text: String,
}

impl Link {
    /// Creates a link.
    pub fn new(url: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_text: display_text.into(),
        }
    }
}

/// One day of progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySnapshot {
    /// Day number, unique within a document but not necessarily contiguous.
    pub day_number: i64,
    /// Calendar date (`YYYY-MM-DD`).
    pub date: String,
    /// Checklist items.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Tags, a set keyed by text.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Links, a set keyed by URL.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl DaySnapshot {
    /// Creates an empty day.
    pub fn new(day_number: i64, date: impl Into<String>) -> Self {
        Self {
            day_number,
            date: date.into(),
            items: Vec::new(),
            tags: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Finds an item by id.
    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Finds an item by id for mutation.
    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    /// Returns true if a tag with this text is present.
    pub fn has_tag(&self, text: &str) -> bool {
        self.tags.iter().any(|tag| tag.text == text)
    }

    /// Returns true if a link with this URL is present.
    pub fn has_link(&self, url: &str) -> bool {
        self.links.iter().any(|link| link.url == url)
    }
}

/// Checks the document-level invariants of a day list.
///
/// # Errors
///
/// Returns [`ModelError::DuplicateDay`] if two days share a day number.
pub fn validate_days(days: &[DaySnapshot]) -> ModelResult<()> {
    let mut seen = HashSet::with_capacity(days.len());
    for day in days {
        if !seen.insert(day.day_number) {
            return Err(ModelError::DuplicateDay(day.day_number));
        }
    }
    Ok(())
}

/// The authoritative progress document for one owner.
///
/// Only the store holds the authoritative instance. Clients work on copies
/// carried in [`crate::DocumentState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    /// Owner of the document.
    pub owner_id: OwnerId,
    /// Days in display order.
    pub days: Vec<DaySnapshot>,
    /// Version, incremented once per accepted write. Starts at 1.
    pub version: u64,
    /// Time of the last accepted write.
    pub last_updated: DateTime<Utc>,
}

impl ProgressDocument {
    /// Creates the default document for a new owner: version 1, one day.
    pub fn seeded(owner_id: OwnerId, now: DateTime<Utc>) -> Self {
        let mut day = DaySnapshot::new(1, now.format("%Y-%m-%d").to_string());
        day.items = vec![
            Item::new("seed-1", "Set a goal for today", Difficulty::Easy),
            Item::new("seed-2", "Work on the main task", Difficulty::Medium),
            Item::new("seed-3", "Write a short reflection", Difficulty::Easy),
        ];

        Self {
            owner_id,
            days: vec![day],
            version: 1,
            last_updated: now,
        }
    }

    /// Finds a day by day number.
    pub fn day(&self, day_number: i64) -> Option<&DaySnapshot> {
        self.days.iter().find(|day| day.day_number == day_number)
    }
}
