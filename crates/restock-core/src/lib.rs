//! # restock-core: Pure Inventory Logic for Restock
//!
//! This crate is the **heart** of Restock. It holds every inventory rule as
//! pure functions and plain data with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Restock Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Presentation Layer                           │   │
//! │  │    Item table ──► Add form ──► Inline edit ──► Delete          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ItemView / NewItem / EditField         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 restock-sync (InventoryEngine)                  │   │
//! │  │    start, stop, add_item, delete_item, begin_edit, ...         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ restock-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  status   │  │ snapshot  │  │ validation│  │   │
//! │  │   │   Item    │  │ Priority  │  │  decode   │  │   rules   │  │   │
//! │  │   │ ItemPatch │  │  Status   │  │ raw → Item│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                        ┌───────────┐                            │   │
//! │  │                        │   edit    │                            │   │
//! │  │                        │  session  │                            │   │
//! │  │                        └───────────┘                            │   │
//! │  │   NO I/O • NO STORE ACCESS • NO LOGGING • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, ItemRecord, NewItem, ItemPatch, UserId)
//! - [`status`] - Derived priority status
//! - [`snapshot`] - Decoding raw collection snapshots into items
//! - [`edit`] - The single in-place edit session
//! - [`error`] - Domain error types
//! - [`validation`] - Field and uniqueness rules
//!
//! ## Example Usage
//!
//! ```rust
//! use restock_core::status::{priority_status, PriorityStatus};
//!
//! // Stock below the minimum needs attention
//! assert_eq!(priority_status(5, 10, 20), PriorityStatus::HighPriority);
//!
//! // Both bounds are inclusive
//! assert_eq!(priority_status(20, 10, 20), PriorityStatus::Normal);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod edit;
pub mod error;
pub mod snapshot;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use edit::{EditField, EditSession, WorkingCopy};
pub use error::{DecodeError, ValidationError};
pub use snapshot::{RawSnapshot, SkippedRecord, Snapshot};
pub use status::{priority_status, PriorityStatus, StatusSummary};
pub use types::*;
pub use validation::ValidationRules;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Link schemes accepted when [`ValidationRules::require_valid_link`] is on.
pub const ALLOWED_LINK_SCHEMES: &[&str] = &["http", "https"];
