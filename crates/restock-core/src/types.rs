//! # Domain Types
//!
//! Core domain types used throughout Restock.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ItemRecord    │   │      Item       │   │    ItemView     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  wire shape     │──►│  id (remote key)│──►│  Item fields    │       │
//! │  │  name, stock    │   │  + record fields│   │  + priority     │       │
//! │  │  min, max, link │   │                 │   │    status       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    NewItem      │   │   ItemPatch     │   │     UserId      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  add candidate  │   │  partial update │   │  opaque owner   │       │
//! │  │  (no id yet)    │   │  merged remote  │   │  of collection  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! The `id` of an item is assigned by the remote store when the record is
//! inserted. It travels out-of-band as the collection key and is never part
//! of the wire record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::status::{priority_status, PriorityStatus};

// =============================================================================
// User Id
// =============================================================================

/// Opaque identifier of the authenticated user owning a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if the id is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId(id)
    }
}

// =============================================================================
// Item Record (wire shape)
// =============================================================================

/// An item exactly as it is stored in the remote collection.
///
/// Field names are fixed: `name`, `stock`, `min`, `max`, `link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub stock: i64,
    pub min: i64,
    pub max: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

// =============================================================================
// Item
// =============================================================================

/// An inventory item as held in the engine's snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    /// Key assigned by the remote store (stable for the record's lifetime).
    pub id: String,

    /// Display name, case-insensitively unique within one collection.
    pub name: String,

    /// Current stock level.
    pub stock: i64,

    /// Lower bound of the allowed stock band.
    pub min: i64,

    /// Upper bound of the allowed stock band.
    pub max: i64,

    /// Optional quick-order link.
    pub link: Option<String>,
}

impl Item {
    /// Builds an item from its remote key and wire record.
    pub fn from_record(id: impl Into<String>, record: ItemRecord) -> Self {
        Item {
            id: id.into(),
            name: record.name,
            stock: record.stock,
            min: record.min,
            max: record.max,
            link: normalize_link(record.link),
        }
    }

    /// Returns the wire record for this item (without the id).
    pub fn record(&self) -> ItemRecord {
        ItemRecord {
            name: self.name.clone(),
            stock: self.stock,
            min: self.min,
            max: self.max,
            link: self.link.clone(),
        }
    }

    /// Derived priority status, computed against the committed values.
    #[inline]
    pub fn priority_status(&self) -> PriorityStatus {
        priority_status(self.stock, self.min, self.max)
    }

    /// Returns the presentation view of this item.
    pub fn view(&self) -> ItemView {
        ItemView {
            id: self.id.clone(),
            name: self.name.clone(),
            stock: self.stock,
            min: self.min,
            max: self.max,
            link: self.link.clone(),
            priority_status: self.priority_status(),
        }
    }
}

// =============================================================================
// Item View
// =============================================================================

/// Read-only item annotated with its derived priority status.
///
/// Serialised in camelCase for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub stock: i64,
    pub min: i64,
    pub max: i64,
    pub link: Option<String>,
    pub priority_status: PriorityStatus,
}

// =============================================================================
// New Item
// =============================================================================

/// Candidate for the add operation. The remote store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewItem {
    pub name: String,
    pub stock: i64,
    pub min: i64,
    pub max: i64,
    #[serde(default)]
    pub link: Option<String>,
}

impl NewItem {
    /// Creates a candidate without a link.
    pub fn new(name: impl Into<String>, stock: i64, min: i64, max: i64) -> Self {
        NewItem {
            name: name.into(),
            stock,
            min,
            max,
            link: None,
        }
    }

    /// Sets the quick-order link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Converts the candidate into the record sent to the remote store.
    ///
    /// The name is trimmed and an empty link is dropped.
    pub fn into_record(self) -> ItemRecord {
        ItemRecord {
            name: self.name.trim().to_string(),
            stock: self.stock,
            min: self.min,
            max: self.max,
            link: normalize_link(self.link),
        }
    }
}

// =============================================================================
// Item Patch
// =============================================================================

/// Partial update merged into an existing remote record.
///
/// `None` leaves a field untouched. For `link`, `Some(None)` removes the
/// field from the record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Option<String>>,
}

impl ItemPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.stock.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && self.link.is_none()
    }

    /// Merges the patch into a JSON object holding a wire record.
    pub fn merge_into(&self, record: &mut Map<String, Value>) {
        if let Some(name) = &self.name {
            record.insert("name".into(), Value::from(name.clone()));
        }
        if let Some(stock) = self.stock {
            record.insert("stock".into(), Value::from(stock));
        }
        if let Some(min) = self.min {
            record.insert("min".into(), Value::from(min));
        }
        if let Some(max) = self.max {
            record.insert("max".into(), Value::from(max));
        }
        match &self.link {
            Some(Some(link)) => {
                record.insert("link".into(), Value::from(link.clone()));
            }
            Some(None) => {
                record.remove("link");
            }
            None => {}
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Trims a link and drops it when nothing is left.
pub fn normalize_link(link: Option<String>) -> Option<String> {
    link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
