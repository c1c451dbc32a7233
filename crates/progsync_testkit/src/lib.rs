//! # progsync Testkit
//!
//! Test utilities for progsync.
//!
//! This crate provides:
//! - Fixtures: a fixed start time, manual clocks, day builders and stores
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use progsync_testkit::prelude::*;
//!
//! let fixture = TestStore::memory();
//! let day = DayBuilder::new(1).item("a", "Read").completed("b", "Write").build();
//! assert_eq!(day.items.len(), 2);
//! fixture.clock.advance_millis(500);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
