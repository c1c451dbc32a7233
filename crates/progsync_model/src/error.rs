//! Error types for model validation and edits.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating a snapshot or applying an edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Two days in one document share a day number.
    #[error("duplicate day number {0}")]
    DuplicateDay(i64),

    /// The addressed day does not exist.
    #[error("day {0} not found")]
    DayNotFound(i64),

    /// The addressed item does not exist in the given day.
    #[error("item {item_id} not found in day {day}")]
    ItemNotFound {
        /// Day number searched.
        day: i64,
        /// Item id that was not found.
        item_id: String,
    },

    /// An item with this id already exists in the day.
    #[error("item {item_id} already exists in day {day}")]
    DuplicateItem {
        /// Day number.
        day: i64,
        /// Conflicting item id.
        item_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::ItemNotFound {
            day: 4,
            item_id: "abc".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains('4'));

        assert_eq!(ModelError::DuplicateDay(2).to_string(), "duplicate day number 2");
    }
}
