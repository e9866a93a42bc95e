//! # Collection Snapshots
//!
//! A snapshot is the full content of one user's collection at one moment.
//! The remote store delivers it raw (`key -> JSON record`); this module turns
//! it into items.
//!
//! ## Decode Flow
//! ```text
//! RawSnapshot { "k1": {...}, "k2": {...}, "k3": "garbage" }
//!       │
//!       ▼
//! ┌────────────────────────┐
//! │ per entry:             │
//! │  object? ──no──► skip  │──► SkippedRecord { id: "k3", reason }
//! │  decode  ──err─► skip  │
//! │  ok ──► Item           │
//! └────────────────────────┘
//!       │
//!       ▼
//! Snapshot { items: k1, k2 (ordered by key), skipped: [k3] }
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::DecodeError;
use crate::status::StatusSummary;
use crate::types::{Item, ItemRecord, ItemView};
use crate::validation::names_match;

/// Raw collection content as delivered by the remote store.
pub type RawSnapshot = BTreeMap<String, Value>;

/// A raw record that was left out of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: DecodeError,
}

/// Decoded, immutable view of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    items: BTreeMap<String, Item>,
    skipped: Vec<SkippedRecord>,
}

impl Snapshot {
    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes a raw snapshot, skipping records that do not decode.
    pub fn decode(raw: RawSnapshot) -> Self {
        let mut snapshot = Snapshot::empty();

        for (id, value) in raw {
            match decode_record(&id, value) {
                Ok(item) => {
                    snapshot.items.insert(id, item);
                }
                Err(reason) => snapshot.skipped.push(SkippedRecord { id, reason }),
            }
        }

        snapshot
    }

    /// Builds a snapshot from already decoded items.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        Snapshot {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            skipped: Vec::new(),
        }
    }

    /// Looks an item up by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Checks whether an item with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Finds an item whose name matches case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Option<&Item> {
        self.items.values().find(|item| names_match(&item.name, name))
    }

    /// Items in key order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Number of decoded items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when no item decoded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Records that failed to decode.
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    /// Presentation views in key order, each with its derived status.
    pub fn views(&self) -> Vec<ItemView> {
        self.items.values().map(Item::view).collect()
    }

    /// Status counts over all items.
    pub fn summary(&self) -> StatusSummary {
        StatusSummary::of(self.items.values())
    }
}

/// Decodes one raw record.
pub fn decode_record(id: &str, value: Value) -> Result<Item, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let record: ItemRecord = serde_json::from_value(value)?;
    Ok(Item::from_record(id, record))
}

// =============================================================================
// Unit Tests
// =============================================================================
