//! # Edit Session
//!
//! At most one item is edited in place at a time. The session holds a
//! working copy of the item's mutable fields until it is committed or
//! cancelled.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            begin(item)                                                  │
//! │   ┌──────┐ ───────────────────────► ┌───────────┐ ──┐ update(field)    │
//! │   │ Idle │                          │  Editing  │   │ begin(other)     │
//! │   └──────┘ ◄─────────────────────── └───────────┘ ◄─┘ (replaces copy,  │
//! │            take() / cancel()                           no warning)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `min` and `max` are not part of the working copy; they are only set when
//! an item is created.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::status::{priority_status, PriorityStatus};
use crate::types::{normalize_link, Item, ItemPatch};
use crate::validation::{validate_item_name, validate_link, validate_stock, ValidationResult, ValidationRules};

// =============================================================================
// Edit Field
// =============================================================================

/// A single field change applied to the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum EditField {
    Name(String),
    Stock(i64),
    Link(Option<String>),
}

impl EditField {
    /// Parses a field change from a field name and the raw input text.
    ///
    /// ## Example
    /// ```rust
    /// use restock_core::edit::EditField;
    ///
    /// assert_eq!(EditField::parse("stock", "50").unwrap(), EditField::Stock(50));
    /// assert_eq!(EditField::parse("link", "").unwrap(), EditField::Link(None));
    /// assert!(EditField::parse("stock", "lots").is_err());
    /// assert!(EditField::parse("colour", "red").is_err());
    /// ```
    pub fn parse(field: &str, raw: &str) -> ValidationResult<Self> {
        match field.trim().to_lowercase().as_str() {
            "name" => Ok(EditField::Name(raw.to_string())),
            "stock" | "quantity" => raw.trim().parse::<i64>().map(EditField::Stock).map_err(|e| {
                ValidationError::InvalidFormat {
                    field: "stock".to_string(),
                    reason: e.to_string(),
                }
            }),
            "link" => Ok(EditField::Link(normalize_link(Some(raw.to_string())))),
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }

    /// Wire name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            EditField::Name(_) => "name",
            EditField::Stock(_) => "stock",
            EditField::Link(_) => "link",
        }
    }
}

// =============================================================================
// Working Copy
// =============================================================================

/// Mutable fields of one item while it is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingCopy {
    /// Id of the item being edited.
    pub id: String,
    pub name: String,
    pub stock: i64,
    pub link: Option<String>,
}

impl WorkingCopy {
    /// Copies the mutable fields of a committed item.
    pub fn of(item: &Item) -> Self {
        WorkingCopy {
            id: item.id.clone(),
            name: item.name.clone(),
            stock: item.stock,
            link: item.link.clone(),
        }
    }

    /// Applies one field change.
    pub fn apply(&mut self, field: EditField) {
        match field {
            EditField::Name(name) => self.name = name,
            EditField::Stock(stock) => self.stock = stock,
            EditField::Link(link) => self.link = normalize_link(link),
        }
    }

    /// Checks the working copy before it is committed.
    ///
    /// Name and stock are only checked with `validate_on_commit`; the link
    /// follows `require_valid_link`. Default rules accept any copy.
    pub fn validate(&self, rules: &ValidationRules) -> ValidationResult<()> {
        if rules.validate_on_commit {
            validate_item_name(&self.name)?;
            validate_stock(self.stock)?;
        }
        validate_link(self.link.as_deref(), rules)
    }

    /// The update sent to the remote store on commit.
    ///
    /// Every editable field is included; a cleared link removes the field.
    pub fn to_patch(&self) -> ItemPatch {
        ItemPatch {
            name: Some(self.name.trim().to_string()),
            stock: Some(self.stock),
            link: Some(self.link.clone()),
            ..Default::default()
        }
    }

    /// Status the item would have if this copy were committed.
    ///
    /// Lets a presentation layer preview the edit; the engine itself only
    /// reports status for committed values.
    pub fn preview_status(&self, committed: &Item) -> PriorityStatus {
        priority_status(self.stock, committed.min, committed.max)
    }
}

// =============================================================================
// Edit Session
// =============================================================================

/// The {Idle, Editing} session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditSession {
    #[default]
    Idle,
    Editing(WorkingCopy),
}

impl EditSession {
    /// Returns true while a working copy is open.
    pub fn is_editing(&self) -> bool {
        matches!(self, EditSession::Editing(_))
    }

    /// The open working copy, if any.
    pub fn working_copy(&self) -> Option<&WorkingCopy> {
        match self {
            EditSession::Idle => None,
            EditSession::Editing(copy) => Some(copy),
        }
    }

    /// Opens a session on `item`, returning any working copy it replaced.
    pub fn begin(&mut self, item: &Item) -> Option<WorkingCopy> {
        std::mem::replace(self, EditSession::Editing(WorkingCopy::of(item))).into_working_copy()
    }

    /// Applies a field change. Returns false when no session is open.
    pub fn update(&mut self, field: EditField) -> bool {
        match self {
            EditSession::Idle => false,
            EditSession::Editing(copy) => {
                copy.apply(field);
                true
            }
        }
    }

    /// Closes the session and hands back the working copy.
    pub fn take(&mut self) -> Option<WorkingCopy> {
        std::mem::take(self).into_working_copy()
    }

    fn into_working_copy(self) -> Option<WorkingCopy> {
        match self {
            EditSession::Idle => None,
            EditSession::Editing(copy) => Some(copy),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemRecord;

    fn bolt() -> Item {
        Item::from_record(
            "k1",
            ItemRecord {
                name: "Bolt".into(),
                stock: 5,
                min: 10,
                max: 20,
                link: Some("https://shop.example/bolt".into()),
            },
        )
    }

    #[test]
    fn test_begin_update_take() {
        let mut session = EditSession::default();
        assert!(!session.is_editing());

        assert!(session.begin(&bolt()).is_none());
        assert!(session.update(EditField::Stock(50)));

        let copy = session.take().unwrap();
        assert_eq!(copy.id, "k1");
        assert_eq!(copy.stock, 50);
        assert_eq!(session, EditSession::Idle);
    }

    #[test]
    fn test_update_without_session() {
        let mut session = EditSession::Idle;
        assert!(!session.update(EditField::Stock(1)));
        assert!(session.take().is_none());
    }

    #[test]
    fn test_second_begin_replaces_copy() {
        let mut session = EditSession::default();
        session.begin(&bolt());
        session.update(EditField::Name("Renamed".into()));

        let other = Item::from_record(
            "k2",
            ItemRecord {
                name: "Nut".into(),
                stock: 1,
                min: 0,
                max: 5,
                link: None,
            },
        );
        let discarded = session.begin(&other).unwrap();

        assert_eq!(discarded.name, "Renamed");
        assert_eq!(session.working_copy().map(|c| c.id.as_str()), Some("k2"));
    }

    #[test]
    fn test_patch_covers_editable_fields() {
        let mut copy = WorkingCopy::of(&bolt());
        copy.apply(EditField::Link(Some("   ".into())));

        let patch = copy.to_patch();
        assert_eq!(patch.name.as_deref(), Some("Bolt"));
        assert_eq!(patch.stock, Some(5));
        assert_eq!(patch.link, Some(None));
        assert_eq!(patch.min, None);
        assert_eq!(patch.max, None);
    }

    #[test]
    fn test_validate_working_copy() {
        let rules = ValidationRules {
            validate_on_commit: true,
            ..Default::default()
        };
        let mut copy = WorkingCopy::of(&bolt());
        assert!(copy.validate(&rules).is_ok());

        copy.apply(EditField::Stock(-2));
        assert!(copy.validate(&rules).is_err());

        copy.apply(EditField::Stock(2));
        copy.apply(EditField::Name(String::new()));
        assert!(copy.validate(&rules).is_err());
    }

    #[test]
    fn test_default_rules_accept_any_working_copy() {
        let rules = ValidationRules::default();
        let mut copy = WorkingCopy::of(&bolt());
        copy.apply(EditField::Stock(-2));
        copy.apply(EditField::Name("  ".into()));
        copy.apply(EditField::Link(Some("not a url".into())));
        assert!(copy.validate(&rules).is_ok());

        let strict = ValidationRules::strict();
        assert!(copy.validate(&strict).is_err());
    }

    #[test]
    fn test_preview_status() {
        let item = bolt();
        let mut copy = WorkingCopy::of(&item);
        assert!(copy.preview_status(&item).is_high());
        copy.apply(EditField::Stock(15));
        assert!(!copy.preview_status(&item).is_high());
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(EditField::parse("Name", "Bolt").unwrap(), EditField::Name("Bolt".into()));
        assert_eq!(EditField::parse("quantity", " 7 ").unwrap(), EditField::Stock(7));
        assert_eq!(EditField::parse("stock", "7").unwrap().name(), "stock");
        assert!(matches!(
            EditField::parse("min", "3"),
            Err(ValidationError::UnknownField(_))
        ));
    }
}
