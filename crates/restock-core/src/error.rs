//! # Error Types
//!
//! Domain-specific error types for restock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  restock-core errors (this file)                                       │
//! │  ├── ValidationError  - Field values rejected before any remote call   │
//! │  └── DecodeError      - Wire record could not be turned into an Item   │
//! │                                                                         │
//! │  restock-sync errors (separate crate)                                  │
//! │  ├── RemoteError      - Remote collection failures                     │
//! │  └── InventoryError   - What the presentation layer sees               │
//! │                                                                         │
//! │  Flow: ValidationError → InventoryError::InvalidFields → caller        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when an item candidate or an edit working copy does not
/// meet the field rules. They are detected before the remote store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero (got {value})")]
    MustBePositive { field: String, value: i64 },

    /// Minimum threshold is above the maximum.
    ///
    /// Only raised when `ValidationRules::enforce_min_le_max` is enabled.
    #[error("min ({min}) must not exceed max ({max})")]
    ThresholdsInverted { min: i64, max: i64 },

    /// Invalid format (e.g. a link that is not a URL, a non-numeric stock).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field name that the edit session does not know about.
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn negative(field: &str, value: i64) -> Self {
        ValidationError::Negative {
            field: field.to_string(),
            value,
        }
    }
}

// =============================================================================
// Decode Error
// =============================================================================

/// A raw record from the remote collection that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// A field is missing or has the wrong type.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidRecord(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
