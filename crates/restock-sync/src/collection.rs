//! # Remote Collection Contract
//!
//! The engine's only view of the backing store: a per-user collection of
//! records addressed by store-generated keys, with push subscriptions.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     RemoteCollection                                    │
//! │                                                                         │
//! │  subscribe(user, listener) ──► listener(full snapshot)  immediately    │
//! │                                listener(full snapshot)  on every change│
//! │                                                                         │
//! │  unsubscribe(id)            ──► no delivery afterwards (idempotent)    │
//! │  insert(user, record)       ──► new key; visible via a later snapshot  │
//! │  update(user, id, patch)    ──► merge fields; RecordNotFound if absent │
//! │  delete(user, id)           ──► idempotent                             │
//! │                                                                         │
//! │  Per listener: snapshots arrive in order, the latest is never dropped. │
//! │  No internal retries: see RetryingCollection.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use restock_core::{ItemPatch, ItemRecord, RawSnapshot, UserId};

use crate::error::RemoteResult;

/// Callback receiving full collection snapshots.
pub type SnapshotListener = Arc<dyn Fn(RawSnapshot) + Send + Sync>;

/// Handle of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(value: u64) -> Self {
        SubscriptionId(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A per-user remote collection of item records.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Registers a listener for `user_id`'s collection.
    async fn subscribe(&self, user_id: &UserId, listener: SnapshotListener) -> RemoteResult<SubscriptionId>;

    /// Stops delivery to a listener. Idempotent.
    fn unsubscribe(&self, subscription: SubscriptionId);

    /// Inserts a record and returns the key the store assigned.
    async fn insert(&self, user_id: &UserId, record: &ItemRecord) -> RemoteResult<String>;

    /// Merges `patch` into the record at `id`.
    async fn update(&self, user_id: &UserId, id: &str, patch: &ItemPatch) -> RemoteResult<()>;

    /// Removes the record at `id`. Deleting a missing id succeeds.
    async fn delete(&self, user_id: &UserId, id: &str) -> RemoteResult<()>;
}
