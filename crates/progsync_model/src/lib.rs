//! # progsync model
//!
//! Data model and wire messages for progress-document synchronization.
//!
//! This crate provides:
//! - [`ProgressDocument`] and its parts ([`DaySnapshot`], [`Item`], [`Tag`], [`Link`])
//! - Typed local mutations ([`Edit`])
//! - Protocol messages exchanged between client and server
//! - Conflict descriptors and user resolutions
//! - A [`Clock`] seam so time-dependent logic stays testable
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod conflict;
mod document;
mod edit;
mod error;
mod messages;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conflict::{ConflictPayload, ConflictReason, Resolution};
pub use document::{
    validate_days, DaySnapshot, Difficulty, Item, Link, OwnerId, ProgressDocument, Tag,
};
pub use edit::Edit;
pub use error::{ModelError, ModelResult};
pub use messages::{DocumentState, ErrorBody, ForcePushRequest, HealthResponse, SubmitRequest};
