//! # Validation Module
//!
//! Field and uniqueness rules applied before any remote write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Add Item Validation                                │
//! │                                                                         │
//! │  Step 1: name non-empty (after trimming)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Step 2: stock >= 0, min >= 0, max > 0                                 │
//! │          (+ min <= max, link is a URL when those rules are enabled)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Step 3: no item in the CURRENT SNAPSHOT has the same name             │
//! │          (case-insensitive; checked at creation only)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  OK → remote insert                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Uniqueness is only as strong as the local snapshot: two clients adding
//! the same name at the same time can both pass step 3.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{ItemRecord, NewItem};
use crate::ALLOWED_LINK_SCHEMES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Validation Rules
// =============================================================================

/// Optional rules on top of the always-on field checks.
///
/// All default to off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Reject candidates whose `min` is above their `max`.
    #[serde(default)]
    pub enforce_min_le_max: bool,

    /// Reject links that are not absolute http(s) URLs.
    #[serde(default)]
    pub require_valid_link: bool,

    /// Check the working copy's name and stock before an edit is committed.
    /// A rejected commit keeps the session open.
    #[serde(default)]
    pub validate_on_commit: bool,
}

impl ValidationRules {
    /// The strict rule set: every optional rule enabled.
    pub fn strict() -> Self {
        ValidationRules {
            enforce_min_le_max: true,
            require_valid_link: true,
            validate_on_commit: true,
        }
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an item name.
///
/// ## Example
/// ```rust
/// use restock_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Bolt").is_ok());
/// assert!(validate_item_name("").is_err());
/// assert!(validate_item_name("   ").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::required("name"));
    }
    Ok(())
}

/// Validates a stock level (`>= 0`).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::negative("stock", stock));
    }
    Ok(())
}

/// Validates the `[min, max]` thresholds.
///
/// `min >= 0` and `max > 0` always apply; `min <= max` only when the rule
/// is enabled.
pub fn validate_thresholds(min: i64, max: i64, rules: &ValidationRules) -> ValidationResult<()> {
    if min < 0 {
        return Err(ValidationError::negative("min", min));
    }

    if max <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "max".to_string(),
            value: max,
        });
    }

    if rules.enforce_min_le_max && min > max {
        return Err(ValidationError::ThresholdsInverted { min, max });
    }

    Ok(())
}

/// Validates an order link.
///
/// Absent links are always fine. A present link is only checked when
/// `require_valid_link` is on.
pub fn validate_link(link: Option<&str>, rules: &ValidationRules) -> ValidationResult<()> {
    let Some(link) = link else {
        return Ok(());
    };

    if !rules.require_valid_link {
        return Ok(());
    }

    let parsed = url::Url::parse(link).map_err(|e| ValidationError::InvalidFormat {
        field: "link".to_string(),
        reason: e.to_string(),
    })?;

    if !ALLOWED_LINK_SCHEMES.contains(&parsed.scheme()) {
        return Err(ValidationError::InvalidFormat {
            field: "link".to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(())
}

/// Validates an add candidate and returns the normalised wire record.
///
/// Runs steps 1 and 2 of the add flow; uniqueness is checked separately
/// against a snapshot (see [`crate::snapshot::Snapshot::find_by_name`]).
pub fn validate_new_item(candidate: NewItem, rules: &ValidationRules) -> ValidationResult<ItemRecord> {
    validate_item_name(&candidate.name)?;
    validate_stock(candidate.stock)?;
    validate_thresholds(candidate.min, candidate.max, rules)?;

    let record = candidate.into_record();
    validate_link(record.link.as_deref(), rules)?;

    Ok(record)
}

/// Case-insensitive name comparison used for uniqueness.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
