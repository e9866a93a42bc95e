//! # In-Memory Collection
//!
//! A [`RemoteCollection`] kept entirely in process memory. Used by the test
//! suites, the seed binary and local development.
//!
//! ## Delivery Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Snapshot Delivery                                  │
//! │                                                                         │
//! │  write ──► enqueue snapshot for every listener of that user            │
//! │                    │                                                    │
//! │        ┌───────────┴────────────┐                                       │
//! │        ▼ IMMEDIATE              ▼ MANUAL                               │
//! │  drained before the       held until flush() is called,                │
//! │  write returns            including the initial snapshot of            │
//! │                           a new subscription                           │
//! │                                                                         │
//! │  Queue is FIFO and drained by one thread at a time, so each listener   │
//! │  sees snapshots in write order.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call is recorded in a call log, and failures can be injected with
//! [`InMemoryCollection::fail_next`].

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use restock_core::{ItemPatch, ItemRecord, RawSnapshot, UserId};

use crate::collection::{RemoteCollection, SnapshotListener, SubscriptionId};
use crate::error::{RemoteError, RemoteResult};

// =============================================================================
// Delivery Mode
// =============================================================================

/// When queued snapshots reach listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Deliver before the write call returns.
    #[default]
    Immediate,
    /// Deliver only on [`InMemoryCollection::flush`].
    Manual,
}

// =============================================================================
// Call Log
// =============================================================================

/// One recorded call against the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionCall {
    Subscribe { user_id: UserId },
    Unsubscribe { subscription: SubscriptionId },
    Insert { user_id: UserId, record: ItemRecord },
    Update { user_id: UserId, id: String, patch: ItemPatch },
    Delete { user_id: UserId, id: String },
}

impl CollectionCall {
    /// Returns true for insert, update and delete.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CollectionCall::Insert { .. } | CollectionCall::Update { .. } | CollectionCall::Delete { .. }
        )
    }
}

// =============================================================================
// State
// =============================================================================

struct Subscriber {
    user_id: UserId,
    listener: SnapshotListener,
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<UserId, RawSnapshot>,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    pending: VecDeque<(SubscriptionId, RawSnapshot)>,
    calls: Vec<CollectionCall>,
    failures: VecDeque<RemoteError>,
    next_subscription: u64,
}

impl MemoryState {
    /// Queues the user's current collection for each of their listeners.
    fn enqueue_for_user(&mut self, user_id: &UserId) {
        let snapshot = self.collections.get(user_id).cloned().unwrap_or_default();
        let targets: Vec<SubscriptionId> = self
            .subscribers
            .iter()
            .filter(|(_, s)| &s.user_id == user_id)
            .map(|(id, _)| *id)
            .collect();

        for id in targets {
            self.pending.push_back((id, snapshot.clone()));
        }
    }

    fn take_failure(&mut self) -> RemoteResult<()> {
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// =============================================================================
// In-Memory Collection
// =============================================================================

/// Process-local remote collection.
#[derive(Default)]
pub struct InMemoryCollection {
    mode: DeliveryMode,
    state: Mutex<MemoryState>,
    delivery: Mutex<()>,
}

impl InMemoryCollection {
    /// Creates a collection that delivers snapshots immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection with the given delivery mode.
    pub fn with_mode(mode: DeliveryMode) -> Self {
        InMemoryCollection {
            mode,
            ..Default::default()
        }
    }

    /// Delivery mode of this collection.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers queued snapshots (manual mode). Returns how many were delivered.
    pub fn flush(&self) -> usize {
        self.drain()
    }

    /// Number of snapshots waiting for delivery.
    pub fn pending_deliveries(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Makes the next call fail with `err`. Queued failures are used in order.
    pub fn fail_next(&self, err: RemoteError) {
        self.lock().failures.push_back(err);
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<CollectionCall> {
        self.lock().calls.clone()
    }

    /// Write calls (insert, update, delete) made so far.
    pub fn writes(&self) -> Vec<CollectionCall> {
        self.lock().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    /// Forgets the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current raw content of a user's collection.
    pub fn records(&self, user_id: &UserId) -> RawSnapshot {
        self.lock().collections.get(user_id).cloned().unwrap_or_default()
    }

    /// Writes a raw value under `id`, as another writer would. Not logged.
    pub fn put_raw(&self, user_id: &UserId, id: impl Into<String>, value: Value) {
        {
            let mut state = self.lock();
            state
                .collections
                .entry(user_id.clone())
                .or_default()
                .insert(id.into(), value);
            state.enqueue_for_user(user_id);
        }
        self.after_write();
    }

    /// Re-emits the unchanged collection to the user's listeners.
    pub fn redeliver(&self, user_id: &UserId) {
        self.lock().enqueue_for_user(user_id);
        self.after_write();
    }

    fn after_write(&self) {
        if self.mode == DeliveryMode::Immediate {
            self.drain();
        }
    }

    /// Pops the next delivery whose listener is still registered.
    fn next_delivery(&self) -> Option<(SubscriptionId, SnapshotListener, RawSnapshot)> {
        let mut state = self.lock();
        while let Some((id, snapshot)) = state.pending.pop_front() {
            if let Some(subscriber) = state.subscribers.get(&id) {
                return Some((id, subscriber.listener.clone(), snapshot));
            }
        }
        None
    }

    fn drain(&self) -> usize {
        let mut delivered = 0;
        loop {
            {
                let _guard = match self.delivery.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                    // Another thread is draining and will pick up our entries.
                    Err(TryLockError::WouldBlock) => return delivered,
                };

                while let Some((id, listener, snapshot)) = self.next_delivery() {
                    trace!(subscription = %id, records = snapshot.len(), "Delivering snapshot");
                    listener(snapshot);
                    delivered += 1;
                }
            }

            if self.lock().pending.is_empty() {
                return delivered;
            }
        }
    }
}

#[async_trait]
impl RemoteCollection for InMemoryCollection {
    async fn subscribe(&self, user_id: &UserId, listener: SnapshotListener) -> RemoteResult<SubscriptionId> {
        let id = {
            let mut state = self.lock();
            state.calls.push(CollectionCall::Subscribe {
                user_id: user_id.clone(),
            });
            state.take_failure()?;

            state.next_subscription += 1;
            let id = SubscriptionId::new(state.next_subscription);
            state.subscribers.insert(
                id,
                Subscriber {
                    user_id: user_id.clone(),
                    listener,
                },
            );

            let initial = state.collections.get(user_id).cloned().unwrap_or_default();
            state.pending.push_back((id, initial));
            id
        };

        debug!(user_id = %user_id, subscription = %id, "Listener registered");
        self.after_write();
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut state = self.lock();
        state.calls.push(CollectionCall::Unsubscribe { subscription });
        if state.subscribers.remove(&subscription).is_some() {
            state.pending.retain(|(id, _)| *id != subscription);
            debug!(subscription = %subscription, "Listener removed");
        }
    }

    async fn insert(&self, user_id: &UserId, record: &ItemRecord) -> RemoteResult<String> {
        let id = {
            let mut state = self.lock();
            state.calls.push(CollectionCall::Insert {
                user_id: user_id.clone(),
                record: record.clone(),
            });
            state.take_failure()?;

            let value = serde_json::to_value(record)?;
            let id = Uuid::now_v7().to_string();
            state
                .collections
                .entry(user_id.clone())
                .or_default()
                .insert(id.clone(), value);
            state.enqueue_for_user(user_id);
            id
        };

        debug!(user_id = %user_id, item_id = %id, "Record inserted");
        self.after_write();
        Ok(id)
    }

    async fn update(&self, user_id: &UserId, id: &str, patch: &ItemPatch) -> RemoteResult<()> {
        {
            let mut state = self.lock();
            state.calls.push(CollectionCall::Update {
                user_id: user_id.clone(),
                id: id.to_string(),
                patch: patch.clone(),
            });
            state.take_failure()?;

            let record = state
                .collections
                .get_mut(user_id)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| RemoteError::RecordNotFound { id: id.to_string() })?;

            let object = record
                .as_object_mut()
                .ok_or_else(|| RemoteError::Codec(format!("record {id} is not an object")))?;
            patch.merge_into(object);
            state.enqueue_for_user(user_id);
        }

        debug!(user_id = %user_id, item_id = %id, "Record updated");
        self.after_write();
        Ok(())
    }

    async fn delete(&self, user_id: &UserId, id: &str) -> RemoteResult<()> {
        let removed = {
            let mut state = self.lock();
            state.calls.push(CollectionCall::Delete {
                user_id: user_id.clone(),
                id: id.to_string(),
            });
            state.take_failure()?;

            let removed = state
                .collections
                .get_mut(user_id)
                .and_then(|c| c.remove(id))
                .is_some();
            if removed {
                state.enqueue_for_user(user_id);
            }
            removed
        };

        debug!(user_id = %user_id, item_id = %id, removed, "Record deleted");
        self.after_write();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
