//! Typed local mutations.

use crate::document::{DaySnapshot, Difficulty, Item, Link, Tag};
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// A single user edit applied to a local copy of the document.
///
/// Days are addressed by day number, items by id. An edit that addresses a
/// missing day or item fails and leaves the days untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Edit {
    /// Flips an item's completion flag.
    ToggleItem {
        /// Day number.
        day: i64,
        /// Item id.
        item_id: String,
    },
    /// Sets an item's completion flag.
    SetItemCompleted {
        /// Day number.
        day: i64,
        /// Item id.
        item_id: String,
        /// New flag.
        completed: bool,
    },
    /// Appends an item to a day.
    AddItem {
        /// Day number.
        day: i64,
        /// Item to add.
        item: Item,
    },
    /// Removes an item from a day.
    RemoveItem {
        /// Day number.
        day: i64,
        /// Item id.
        item_id: String,
    },
    /// Replaces an item's text.
    UpdateItemText {
        /// Day number.
        day: i64,
        /// Item id.
        item_id: String,
        /// New text.
        text: String,
    },
    /// Changes an item's difficulty.
    SetItemDifficulty {
        /// Day number.
        day: i64,
        /// Item id.
        item_id: String,
        /// New difficulty.
        difficulty: Difficulty,
    },
    /// Adds a tag unless one with the same text exists.
    AddTag {
        /// Day number.
        day: i64,
        /// Tag to add.
        tag: Tag,
    },
    /// Removes the tag with the given text.
    RemoveTag {
        /// Day number.
        day: i64,
        /// Tag text.
        text: String,
    },
    /// Adds a link unless one with the same URL exists.
    AddLink {
        /// Day number.
        day: i64,
        /// Link to add.
        link: Link,
    },
    /// Removes the link with the given URL.
    RemoveLink {
        /// Day number.
        day: i64,
        /// Link URL.
        url: String,
    },
    /// Appends a new day.
    AddDay {
        /// Day to append.
        day: DaySnapshot,
    },
    /// Removes a whole day.
    RemoveDay {
        /// Day number.
        day_number: i64,
    },
}

impl Edit {
    /// Applies this edit to `days`.
    ///
    /// # Errors
    ///
    /// Returns an error if the addressed day or item does not exist, if an
    /// added item id is already taken, or if an added day number is taken.
    pub fn apply(&self, days: &mut Vec<DaySnapshot>) -> ModelResult<()> {
        match self {
            Edit::ToggleItem { day, item_id } => {
                let item = find_item(days, *day, item_id)?;
                item.completed = !item.completed;
            }
            Edit::SetItemCompleted {
                day,
                item_id,
                completed,
            } => {
                find_item(days, *day, item_id)?.completed = *completed;
            }
            Edit::AddItem { day, item } => {
                let target = find_day(days, *day)?;
                if target.item(&item.id).is_some() {
                    return Err(ModelError::DuplicateItem {
                        day: *day,
                        item_id: item.id.clone(),
                    });
                }
                target.items.push(item.clone());
            }
            Edit::RemoveItem { day, item_id } => {
                let target = find_day(days, *day)?;
                let index = target
                    .items
                    .iter()
                    .position(|item| &item.id == item_id)
                    .ok_or_else(|| ModelError::ItemNotFound {
                        day: *day,
                        item_id: item_id.clone(),
                    })?;
                target.items.remove(index);
            }
            Edit::UpdateItemText { day, item_id, text } => {
                find_item(days, *day, item_id)?.text = text.clone();
            }
            Edit::SetItemDifficulty {
                day,
                item_id,
                difficulty,
            } => {
                find_item(days, *day, item_id)?.difficulty = *difficulty;
            }
            Edit::AddTag { day, tag } => {
                let target = find_day(days, *day)?;
                if !target.has_tag(&tag.text) {
                    target.tags.push(tag.clone());
                }
            }
            Edit::RemoveTag { day, text } => {
                find_day(days, *day)?.tags.retain(|tag| &tag.text != text);
            }
            Edit::AddLink { day, link } => {
                let target = find_day(days, *day)?;
                if !target.has_link(&link.url) {
                    target.links.push(link.clone());
                }
            }
            Edit::RemoveLink { day, url } => {
                find_day(days, *day)?.links.retain(|link| &link.url != url);
            }
            Edit::AddDay { day } => {
                if days.iter().any(|d| d.day_number == day.day_number) {
                    return Err(ModelError::DuplicateDay(day.day_number));
                }
                days.push(day.clone());
            }
            Edit::RemoveDay { day_number } => {
                let index = days
                    .iter()
                    .position(|d| d.day_number == *day_number)
                    .ok_or(ModelError::DayNotFound(*day_number))?;
                days.remove(index);
            }
        }
        Ok(())
    }
}

fn find_day(days: &mut [DaySnapshot], day_number: i64) -> ModelResult<&mut DaySnapshot> {
    days.iter_mut()
        .find(|day| day.day_number == day_number)
        .ok_or(ModelError::DayNotFound(day_number))
}

fn find_item<'a>(
    days: &'a mut [DaySnapshot],
    day_number: i64,
    item_id: &str,
) -> ModelResult<&'a mut Item> {
    find_day(days, day_number)?
        .item_mut(item_id)
        .ok_or_else(|| ModelError::ItemNotFound {
            day: day_number,
            item_id: item_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_days() -> Vec<DaySnapshot> {
        let mut day = DaySnapshot::new(1, "2024-01-01");
        day.items.push(Item::new("a", "first", Difficulty::Easy));
        day.items.push(Item::new("b", "second", Difficulty::Hard));
        vec![day, DaySnapshot::new(2, "2024-01-02")]
    }

    #[test]
    fn toggle_and_set_completed() {
        let mut days = sample_days();
        Edit::ToggleItem {
            day: 1,
            item_id: "a".into(),
        }
        .apply(&mut days)
        .unwrap();
        assert!(days[0].items[0].completed);

        Edit::SetItemCompleted {
            day: 1,
            item_id: "a".into(),
            completed: false,
        }
        .apply(&mut days)
        .unwrap();
        assert!(!days[0].items[0].completed);
    }

    #[test]
    fn add_and_remove_items() {
        let mut days = sample_days();
        Edit::AddItem {
            day: 2,
            item: Item::new("c", "third", Difficulty::Medium),
        }
        .apply(&mut days)
        .unwrap();
        assert_eq!(days[1].items.len(), 1);

        let dup = Edit::AddItem {
            day: 2,
            item: Item::new("c", "again", Difficulty::Easy),
        }
        .apply(&mut days);
        assert!(matches!(dup, Err(ModelError::DuplicateItem { .. })));

        Edit::RemoveItem {
            day: 1,
            item_id: "b".into(),
        }
        .apply(&mut days)
        .unwrap();
        assert_eq!(days[0].items.len(), 1);
    }

    #[test]
    fn tags_and_links_are_sets() {
        let mut days = sample_days();
        let add = Edit::AddTag {
            day: 1,
            tag: Tag::new("focus", "#ff0000"),
        };
        add.apply(&mut days).unwrap();
        add.apply(&mut days).unwrap();
        assert_eq!(days[0].tags.len(), 1);

        let link = Edit::AddLink {
            day: 1,
            link: Link::new("https://a.example", "a"),
        };
        link.apply(&mut days).unwrap();
        link.apply(&mut days).unwrap();
        assert_eq!(days[0].links.len(), 1);

        Edit::RemoveTag {
            day: 1,
            text: "focus".into(),
        }
        .apply(&mut days)
        .unwrap();
        Edit::RemoveLink {
            day: 1,
            url: "https://a.example".into(),
        }
        .apply(&mut days)
        .unwrap();
        assert!(days[0].tags.is_empty());
        assert!(days[0].links.is_empty());
    }

    #[test]
    fn missing_targets_leave_days_untouched() {
        let mut days = sample_days();
        let before = days.clone();

        let err = Edit::ToggleItem {
            day: 9,
            item_id: "a".into(),
        }
        .apply(&mut days)
        .unwrap_err();
        assert_eq!(err, ModelError::DayNotFound(9));

        let err = Edit::UpdateItemText {
            day: 1,
            item_id: "zzz".into(),
            text: "x".into(),
        }
        .apply(&mut days)
        .unwrap_err();
        assert!(matches!(err, ModelError::ItemNotFound { .. }));

        assert_eq!(days, before);
    }

    #[test]
    fn add_and_remove_days() {
        let mut days = sample_days();
        let err = Edit::AddDay {
            day: DaySnapshot::new(2, "2024-01-05"),
        }
        .apply(&mut days)
        .unwrap_err();
        assert_eq!(err, ModelError::DuplicateDay(2));

        Edit::AddDay {
            day: DaySnapshot::new(5, "2024-01-05"),
        }
        .apply(&mut days)
        .unwrap();
        Edit::RemoveDay { day_number: 1 }.apply(&mut days).unwrap();
        let numbers: Vec<_> = days.iter().map(|d| d.day_number).collect();
        assert_eq!(numbers, vec![2, 5]);
    }
}
