//! Structural compatibility of two divergent day lists.
//!
//! The classifier is a heuristic. Two snapshots are compatible when they
//! look like the same plan with a few completion flags flipped, which is
//! what the field-wise merge can reconcile. Anything bigger goes to the
//! user.

use crate::config::SyncPolicy;
use progsync_model::DaySnapshot;
use std::fmt;

/// Why two snapshots were judged unsafe to merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompatibility {
    /// The day counts differ by more than the threshold.
    DayCountDelta {
        /// Days on the server.
        server: usize,
        /// Days in the submission.
        client: usize,
    },
    /// Days at the same position carry different day numbers.
    DayNumberMismatch {
        /// Position in both lists.
        index: usize,
        /// Server day number.
        server: i64,
        /// Submitted day number.
        client: i64,
    },
    /// A paired day's item counts differ by more than the threshold.
    ItemCountDelta {
        /// Day number of the pair.
        day_number: i64,
        /// Items on the server.
        server: usize,
        /// Items in the submission.
        client: usize,
    },
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incompatibility::DayCountDelta { server, client } => {
                write!(f, "day count {server} on server vs {client} submitted")
            }
            Incompatibility::DayNumberMismatch {
                index,
                server,
                client,
            } => write!(
                f,
                "day at position {index} is {server} on server vs {client} submitted"
            ),
            Incompatibility::ItemCountDelta {
                day_number,
                server,
                client,
            } => write!(
                f,
                "day {day_number} has {server} items on server vs {client} submitted"
            ),
        }
    }
}

/// Verdict of [`CompatibilityClassifier::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Safe to auto-merge.
    Compatible,
    /// Needs user resolution.
    Incompatible(Incompatibility),
}

impl Compatibility {
    /// Returns true for [`Compatibility::Compatible`].
    pub fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

/// Decides whether a stale submission may be auto-merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityClassifier {
    max_day_delta: usize,
    max_item_delta: usize,
}

impl CompatibilityClassifier {
    /// Creates a classifier with explicit thresholds.
    pub fn new(max_day_delta: usize, max_item_delta: usize) -> Self {
        Self {
            max_day_delta,
            max_item_delta,
        }
    }

    /// Creates a classifier from the policy thresholds.
    pub fn from_policy(policy: &SyncPolicy) -> Self {
        Self::new(policy.max_day_delta, policy.max_item_delta)
    }

    /// Classifies a server/client pair.
    ///
    /// Days are paired by position. Checks, in order: day-count delta, then
    /// for each pair the day number, then the item-count delta. The first
    /// failing check decides the verdict. Item contents never matter.
    pub fn classify(&self, server: &[DaySnapshot], client: &[DaySnapshot]) -> Compatibility {
        if server.len().abs_diff(client.len()) > self.max_day_delta {
            return Compatibility::Incompatible(Incompatibility::DayCountDelta {
                server: server.len(),
                client: client.len(),
            });
        }

        for (index, (s, c)) in server.iter().zip(client).enumerate() {
            if s.day_number != c.day_number {
                return Compatibility::Incompatible(Incompatibility::DayNumberMismatch {
                    index,
                    server: s.day_number,
                    client: c.day_number,
                });
            }
            if s.items.len().abs_diff(c.items.len()) > self.max_item_delta {
                return Compatibility::Incompatible(Incompatibility::ItemCountDelta {
                    day_number: s.day_number,
                    server: s.items.len(),
                    client: c.items.len(),
                });
            }
        }

        Compatibility::Compatible
    }
}

impl Default for CompatibilityClassifier {
    fn default() -> Self {
        Self::from_policy(&SyncPolicy::default())
    }
}
