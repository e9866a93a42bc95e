//! # Sync Error Types
//!
//! Error types for the remote collection, the engine and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  RemoteError    │  │ InventoryError  │  │     ConfigError         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  InvalidFields  │  │  InvalidConfig          │ │
//! │  │  PermissionDen. │  │  DuplicateName  │  │  LoadFailed             │ │
//! │  │  QuotaExceeded  │  │  NotFound       │  │  SaveFailed             │ │
//! │  │  RecordNotFound │  │  NoActiveEdit   │  │                         │ │
//! │  │  Unavailable    │  │  NotStarted     │  │                         │ │
//! │  │  Codec          │  │  RemoteFailure ◄┼──┼── wraps RemoteError     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use restock_core::ValidationError;

/// Result type alias for remote collection calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result type alias for engine operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Result type alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Remote Error
// =============================================================================

/// Failure reported by a remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The user is not allowed to read or write the collection.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store rejected the call because a quota was exhausted.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Update target does not exist.
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    /// The store is shutting down or temporarily unavailable.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded for the wire.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Codec(err.to_string())
    }
}

impl RemoteError {
    /// Returns true if repeating the call may succeed.
    ///
    /// ## Retryable Errors
    /// - Network failures
    /// - Temporary unavailability
    ///
    /// ## Non-Retryable Errors
    /// - Permission, quota, missing record, codec
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Unavailable(_))
    }
}

// =============================================================================
// Inventory Error
// =============================================================================

/// Coarse classification of an [`InventoryError`], kept as `last_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidFields,
    DuplicateName,
    NotFound,
    NoActiveEdit,
    NotStarted,
    RemoteFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidFields => "invalid_fields",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::NotFound => "not_found",
            ErrorKind::NoActiveEdit => "no_active_edit",
            ErrorKind::NotStarted => "not_started",
            ErrorKind::RemoteFailure => "remote_failure",
        };
        f.write_str(s)
    }
}

/// Error returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Name empty, or stock/min/max (or link) out of the allowed range.
    #[error("Invalid fields: {0}")]
    InvalidFields(#[from] ValidationError),

    /// Case-insensitive name collision with the current snapshot.
    #[error("An item named '{name}' already exists")]
    DuplicateName { name: String },

    /// Edit requested on an id absent from the snapshot.
    #[error("Item not found: {id}")]
    NotFound { id: String },

    /// Field update with no open edit session.
    #[error("No item is being edited")]
    NoActiveEdit,

    /// Mutation issued before a subscription is active.
    #[error("Inventory engine is not started")]
    NotStarted,

    /// The remote collection call failed.
    #[error("Remote failure: {0}")]
    RemoteFailure(#[from] RemoteError),
}

impl InventoryError {
    /// The kind recorded as `last_error`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::InvalidFields(_) => ErrorKind::InvalidFields,
            InventoryError::DuplicateName { .. } => ErrorKind::DuplicateName,
            InventoryError::NotFound { .. } => ErrorKind::NotFound,
            InventoryError::NoActiveEdit => ErrorKind::NoActiveEdit,
            InventoryError::NotStarted => ErrorKind::NotStarted,
            InventoryError::RemoteFailure(_) => ErrorKind::RemoteFailure,
        }
    }

    /// Returns true if the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::RemoteFailure(e) if e.is_retryable())
    }
}

// =============================================================================
// Config Error
// =============================================================================

/// Configuration load/save/validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}
