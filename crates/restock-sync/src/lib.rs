//! # restock-sync: Sync Engine for Restock
//!
//! Keeps a local, validated view of one user's inventory in step with a
//! remote, push-based collection.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Inventory Engine Architecture                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 InventoryEngine (engine.rs)                      │  │
//! │  │                                                                  │  │
//! │  │  snapshot (id -> Item)   edit session   last error              │  │
//! │  │  validation against the snapshot before every write             │  │
//! │  └───────────────┬──────────────────────────────▲───────────────────┘  │
//! │       insert/update/delete              raw snapshots                  │
//! │                  ▼                              │                      │
//! │  ┌──────────────────────────────────────────────┴───────────────────┐  │
//! │  │             dyn RemoteCollection (collection.rs)                 │  │
//! │  │                                                                  │  │
//! │  │   RetryingCollection ──wraps──► InMemoryCollection / real store  │  │
//! │  │   (retry.rs, opt-in)            (memory.rs)                      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  EVENTS (to a presentation layer via InventoryEventEmitter):           │
//! │  • emit_snapshot - after each applied snapshot                         │
//! │  • emit_error    - on every failed operation                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - `InventoryEngine`, event emitter, status
//! - [`collection`] - Remote collection contract
//! - [`memory`] - In-memory collection
//! - [`retry`] - Backoff wrapper for remote calls
//! - [`config`] - Engine configuration (validation rules, retry, logging)
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restock_sync::{EngineConfig, InMemoryCollection, InventoryEngine};
//! use restock_core::NewItem;
//!
//! # async fn demo() -> Result<(), restock_sync::InventoryError> {
//! let config = EngineConfig::load_or_default(None);
//! let engine = InventoryEngine::with_config(Arc::new(InMemoryCollection::new()), config);
//!
//! engine.start("user-1").await?;
//! let id = engine.add_item(NewItem::new("Bolt", 5, 10, 20)).await?;
//!
//! for item in engine.list_items() {
//!     println!("{} {} {}", item.id, item.name, item.priority_status);
//! }
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use collection::{RemoteCollection, SnapshotListener, SubscriptionId};
pub use config::{EngineConfig, LoggingSettings};
pub use engine::{EngineStatus, InventoryEngine, InventoryEventEmitter, NoOpEmitter};
pub use error::{
    ConfigError, ConfigResult, ErrorKind, InventoryError, InventoryResult, RemoteError, RemoteResult,
};
pub use memory::{CollectionCall, DeliveryMode, InMemoryCollection};
pub use retry::{RetrySettings, RetryingCollection};
