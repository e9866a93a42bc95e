//! # Priority Status
//!
//! Derived status of an item, recomputed on every read and never stored.
//!
//! ## The Stock Band
//! ```text
//!            min                     max
//!             │                       │
//!   ──────────┼───────────────────────┼──────────►  stock
//!    HIGH     │        NORMAL         │    HIGH
//!   (reorder) │   (bounds inclusive)  │ (overstock)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Item;

/// Priority of an item relative to its `[min, max]` band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriorityStatus {
    /// Stock lies inside the band.
    #[default]
    Normal,
    /// Stock is below `min` or above `max`.
    HighPriority,
}

impl PriorityStatus {
    /// Returns true for [`PriorityStatus::HighPriority`].
    #[inline]
    pub fn is_high(&self) -> bool {
        matches!(self, PriorityStatus::HighPriority)
    }
}

impl std::fmt::Display for PriorityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityStatus::Normal => write!(f, "normal"),
            PriorityStatus::HighPriority => write!(f, "high_priority"),
        }
    }
}

/// Computes the priority status of a stock level.
///
/// `HighPriority` iff `stock < min || stock > max`. No ordering between `min`
/// and `max` is assumed: with `min > max` every stock level is high priority.
///
/// ## Example
/// ```rust
/// use restock_core::status::{priority_status, PriorityStatus};
///
/// assert_eq!(priority_status(15, 10, 20), PriorityStatus::Normal);
/// assert_eq!(priority_status(21, 10, 20), PriorityStatus::HighPriority);
/// ```
#[inline]
pub const fn priority_status(stock: i64, min: i64, max: i64) -> PriorityStatus {
    if stock < min || stock > max {
        PriorityStatus::HighPriority
    } else {
        PriorityStatus::Normal
    }
}

// =============================================================================
// Status Summary
// =============================================================================

/// Count of items per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub normal: usize,
    pub high_priority: usize,
}

impl StatusSummary {
    /// Tallies the statuses of the given items.
    pub fn of<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        items
            .into_iter()
            .fold(StatusSummary::default(), |mut summary, item| {
                match item.priority_status() {
                    PriorityStatus::Normal => summary.normal += 1,
                    PriorityStatus::HighPriority => summary.high_priority += 1,
                }
                summary
            })
    }

    /// Total number of items counted.
    pub fn total(&self) -> usize {
        self.normal + self.high_priority
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
