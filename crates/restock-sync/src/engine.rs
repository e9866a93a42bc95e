//! # Inventory Engine
//!
//! Keeps a local snapshot of one user's inventory consistent with the remote
//! collection, validates every mutation before it leaves the process, and
//! manages the single edit session.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         InventoryEngine                                 │
//! │                                                                         │
//! │   caller ──► add_item / delete_item / commit_edit                       │
//! │                 │ validate against snapshot (under lock)                │
//! │                 │ lock released                                         │
//! │                 ▼                                                       │
//! │          RemoteCollection ──── insert / update / delete ────► store     │
//! │                                                                         │
//! │   store ──► listener(raw snapshot, generation)                          │
//! │                 │ decode (no lock)                                      │
//! │                 │ lock; generation current? replace snapshot            │
//! │                 ▼                                                       │
//! │          emitter.emit_snapshot(views)  (no lock)                        │
//! │                                                                         │
//! │   Writes never touch the snapshot directly. Only deliveries do.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Subscription Generations
//! `start` and `stop` bump a generation counter under the lock. Each
//! listener carries the generation it was registered for and only applies a
//! snapshot while that generation is current, so nothing lands after `stop`
//! returns and racing `start` calls keep one subscription.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use restock_core::validation::validate_new_item;
use restock_core::{
    EditField, EditSession, ItemView, NewItem, RawSnapshot, Snapshot, UserId, ValidationError, WorkingCopy,
};

use crate::collection::{RemoteCollection, SnapshotListener, SubscriptionId};
use crate::config::EngineConfig;
use crate::error::{ErrorKind, InventoryError, InventoryResult};

// =============================================================================
// Engine Status
// =============================================================================

/// Current engine status for external queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    /// User whose collection is followed (if any).
    pub user_id: Option<UserId>,

    /// Whether a subscription is active.
    pub is_started: bool,

    /// Items in the current snapshot.
    pub item_count: usize,

    /// Items whose stock is outside `[min, max]`.
    pub high_priority_count: usize,

    /// Snapshots applied since the last start.
    pub snapshots_applied: u64,

    /// Records left out of the current snapshot.
    pub skipped_records: usize,

    /// When the current snapshot was applied.
    pub last_snapshot_at: Option<DateTime<Utc>>,

    /// Whether an edit session is open.
    pub is_editing: bool,

    /// Kind of the most recent failure.
    pub last_error: Option<ErrorKind>,
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives engine events for a presentation layer.
///
/// Called without the engine lock held.
pub trait InventoryEventEmitter: Send + Sync {
    /// A new snapshot was applied.
    fn emit_snapshot(&self, items: &[ItemView]);

    /// An operation failed.
    fn emit_error(&self, error: &InventoryError);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl InventoryEventEmitter for NoOpEmitter {
    fn emit_snapshot(&self, _items: &[ItemView]) {}
    fn emit_error(&self, _error: &InventoryError) {}
}

// =============================================================================
// Engine State
// =============================================================================

#[derive(Default)]
struct EngineState {
    user_id: Option<UserId>,
    subscription: Option<SubscriptionId>,
    generation: u64,
    snapshot: Snapshot,
    session: EditSession,
    last_error: Option<ErrorKind>,
    snapshots_applied: u64,
    last_snapshot_at: Option<DateTime<Utc>>,
}

impl EngineState {
    /// Starts a new generation with an empty snapshot and no session.
    fn reset(&mut self, user_id: Option<UserId>) {
        self.generation += 1;
        self.user_id = user_id;
        self.snapshot = Snapshot::empty();
        self.session = EditSession::Idle;
        self.snapshots_applied = 0;
        self.last_snapshot_at = None;
    }

    /// The followed user, once the subscription is in place.
    fn active_user(&self) -> InventoryResult<UserId> {
        match (&self.user_id, self.subscription) {
            (Some(user_id), Some(_)) => Ok(user_id.clone()),
            _ => Err(InventoryError::NotStarted),
        }
    }
}

fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decodes and applies one delivered snapshot.
fn apply_snapshot(state: &Mutex<EngineState>, generation: u64, raw: RawSnapshot, emitter: &dyn InventoryEventEmitter) {
    let snapshot = Snapshot::decode(raw);
    for skipped in snapshot.skipped() {
        warn!(item_id = %skipped.id, reason = %skipped.reason, "Skipping malformed record");
    }

    let views = {
        let mut state = lock_state(state);
        if state.generation != generation {
            debug!(generation, current = state.generation, "Discarding snapshot from released subscription");
            return;
        }

        state.snapshot = snapshot;
        state.snapshots_applied += 1;
        state.last_snapshot_at = Some(Utc::now());
        debug!(
            items = state.snapshot.len(),
            applied = state.snapshots_applied,
            "Snapshot applied"
        );
        state.snapshot.views()
    };

    emitter.emit_snapshot(&views);
}

// =============================================================================
// Inventory Engine
// =============================================================================

/// Synchronizes and validates one user's inventory.
pub struct InventoryEngine {
    collection: Arc<dyn RemoteCollection>,
    config: EngineConfig,
    emitter: Arc<dyn InventoryEventEmitter>,
    state: Arc<Mutex<EngineState>>,
}

impl InventoryEngine {
    /// Creates an engine over `collection` with the default configuration.
    pub fn new(collection: Arc<dyn RemoteCollection>) -> Self {
        Self::with_config(collection, EngineConfig::default())
    }

    /// Creates an engine with a configuration.
    ///
    /// The collection is wrapped for retries when `config.retry.enabled`.
    pub fn with_config(collection: Arc<dyn RemoteCollection>, config: EngineConfig) -> Self {
        Self::with_emitter(collection, config, Arc::new(NoOpEmitter))
    }

    /// Creates an engine with a configuration and a custom event emitter.
    pub fn with_emitter(
        collection: Arc<dyn RemoteCollection>,
        config: EngineConfig,
        emitter: Arc<dyn InventoryEventEmitter>,
    ) -> Self {
        InventoryEngine {
            collection: config.wrap_collection(collection),
            config,
            emitter,
            state: Arc::new(Mutex::new(EngineState::default())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.state)
    }

    /// Records a failure as `last_error` and reports it.
    fn fail(&self, err: InventoryError) -> InventoryError {
        self.lock().last_error = Some(err.kind());

        match &err {
            InventoryError::RemoteFailure(remote) => {
                error!(error = %remote, retryable = remote.is_retryable(), "Remote call failed")
            }
            other => warn!(kind = %other.kind(), error = %other, "Operation rejected"),
        }

        self.emitter.emit_error(&err);
        err
    }

    fn listener(&self, generation: u64) -> SnapshotListener {
        let state: Weak<Mutex<EngineState>> = Arc::downgrade(&self.state);
        let emitter = self.emitter.clone();

        Arc::new(move |raw: RawSnapshot| {
            if let Some(state) = state.upgrade() {
                apply_snapshot(&state, generation, raw, emitter.as_ref());
            }
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts following `user_id`'s collection.
    ///
    /// A no-op when already following that user. Following a different user
    /// releases the old subscription and clears the snapshot and session.
    pub async fn start(&self, user_id: impl Into<UserId>) -> InventoryResult<()> {
        let user_id = user_id.into();
        if user_id.is_blank() {
            return Err(self.fail(InventoryError::InvalidFields(ValidationError::Required {
                field: "user_id".to_string(),
            })));
        }

        let (generation, previous) = {
            let mut state = self.lock();
            if state.subscription.is_some() && state.user_id.as_ref() == Some(&user_id) {
                debug!(user_id = %user_id, "Already started");
                return Ok(());
            }

            let previous = state.subscription.take();
            state.reset(Some(user_id.clone()));
            (state.generation, previous)
        };

        if let Some(previous) = previous {
            self.collection.unsubscribe(previous);
            info!(subscription = %previous, "Released previous subscription");
        }

        let subscription = match self.collection.subscribe(&user_id, self.listener(generation)).await {
            Ok(subscription) => subscription,
            Err(err) => {
                {
                    let mut state = self.lock();
                    if state.generation == generation {
                        state.user_id = None;
                    }
                }
                return Err(self.fail(err.into()));
            }
        };

        let current = {
            let mut state = self.lock();
            let current = state.generation == generation;
            if current {
                state.subscription = Some(subscription);
            }
            current
        };

        if current {
            info!(user_id = %user_id, subscription = %subscription, "Inventory engine started");
        } else {
            // A later start or stop won the race.
            self.collection.unsubscribe(subscription);
            debug!(subscription = %subscription, "Released superseded subscription");
        }

        Ok(())
    }

    /// Releases the subscription and clears the snapshot and edit session.
    ///
    /// Safe to call repeatedly.
    pub fn stop(&self) {
        let (previous, user_id) = {
            let mut state = self.lock();
            let previous = state.subscription.take();
            let user_id = state.user_id.take();
            state.reset(None);
            (previous, user_id)
        };

        match previous {
            Some(subscription) => {
                self.collection.unsubscribe(subscription);
                info!(user_id = ?user_id, subscription = %subscription, "Inventory engine stopped");
            }
            None => debug!("Stop requested while not started"),
        }
    }

    /// Returns true while a subscription is active.
    pub fn is_started(&self) -> bool {
        self.lock().subscription.is_some()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current items ordered by id, each with its priority status.
    pub fn list_items(&self) -> Vec<ItemView> {
        self.lock().snapshot.views()
    }

    /// Kind of the most recent failure.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.lock().last_error
    }

    /// The open working copy, if any.
    pub fn edit_session(&self) -> Option<WorkingCopy> {
        self.lock().session.working_copy().cloned()
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.lock();
        let summary = state.snapshot.summary();

        EngineStatus {
            user_id: state.user_id.clone(),
            is_started: state.subscription.is_some(),
            item_count: state.snapshot.len(),
            high_priority_count: summary.high_priority,
            snapshots_applied: state.snapshots_applied,
            skipped_records: state.snapshot.skipped().len(),
            last_snapshot_at: state.last_snapshot_at,
            is_editing: state.session.is_editing(),
            last_error: state.last_error,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validates and inserts a new item. Returns the id the store assigned.
    ///
    /// The snapshot is not touched; the item appears with the next delivery.
    pub async fn add_item(&self, candidate: NewItem) -> InventoryResult<String> {
        let prepared = {
            let state = self.lock();
            state.active_user().and_then(|user_id| {
                let record = validate_new_item(candidate, &self.config.validation)?;
                if state.snapshot.find_by_name(&record.name).is_some() {
                    return Err(InventoryError::DuplicateName { name: record.name });
                }
                Ok((user_id, record))
            })
        };
        let (user_id, record) = prepared.map_err(|e| self.fail(e))?;

        let id = self
            .collection
            .insert(&user_id, &record)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.lock().last_error = None;
        info!(user_id = %user_id, item_id = %id, name = %record.name, "Item added");
        Ok(id)
    }

    /// Deletes an item. The id is not checked against the snapshot.
    pub async fn delete_item(&self, id: &str) -> InventoryResult<()> {
        let prepared = if id.trim().is_empty() {
            Err(InventoryError::InvalidFields(ValidationError::Required {
                field: "id".to_string(),
            }))
        } else {
            self.lock().active_user()
        };
        let user_id = prepared.map_err(|e| self.fail(e))?;

        self.collection
            .delete(&user_id, id)
            .await
            .map_err(|e| self.fail(e.into()))?;

        info!(user_id = %user_id, item_id = %id, "Item deleted");
        Ok(())
    }

    // =========================================================================
    // Edit Session
    // =========================================================================

    /// Opens an edit session on `id`, replacing any open one.
    pub fn begin_edit(&self, id: &str) -> InventoryResult<()> {
        let result = {
            let mut state = self.lock();
            state.active_user().and_then(|_| {
                let EngineState { snapshot, session, .. } = &mut *state;
                let item = snapshot.get(id).ok_or_else(|| InventoryError::NotFound { id: id.to_string() })?;
                Ok(session.begin(item))
            })
        };

        match result.map_err(|e| self.fail(e))? {
            Some(replaced) => debug!(item_id = %id, replaced = %replaced.id, "Edit session replaced"),
            None => debug!(item_id = %id, "Edit session opened"),
        }
        Ok(())
    }

    /// Applies a field change to the working copy.
    pub fn update_edit_field(&self, field: EditField) -> InventoryResult<()> {
        let name = field.name();
        let updated = self.lock().session.update(field);
        if !updated {
            return Err(self.fail(InventoryError::NoActiveEdit));
        }

        debug!(field = name, "Edit field updated");
        Ok(())
    }

    /// Parses `raw` for the named field and applies it.
    ///
    /// `NoActiveEdit` takes precedence over a parse failure.
    pub fn update_edit_field_text(&self, field: &str, raw: &str) -> InventoryResult<()> {
        if !self.lock().session.is_editing() {
            return Err(self.fail(InventoryError::NoActiveEdit));
        }

        let field = EditField::parse(field, raw).map_err(|e| self.fail(e.into()))?;
        self.update_edit_field(field)
    }

    /// Commits the working copy as a single update.
    ///
    /// Returns `Ok(false)` when no session is open. Otherwise the session
    /// closes whatever the remote outcome, unless an opt-in commit rule
    /// (`validate_on_commit`, `require_valid_link`) rejects the copy, which
    /// keeps the session open.
    pub async fn commit_edit(&self) -> InventoryResult<bool> {
        let prepared = {
            let mut state = self.lock();
            self.take_commit(&mut state)
        };

        let Some((user_id, copy)) = prepared.map_err(|e| self.fail(e))? else {
            debug!("Commit requested with no open edit session");
            return Ok(false);
        };

        self.collection
            .update(&user_id, &copy.id, &copy.to_patch())
            .await
            .map_err(|e| self.fail(e.into()))?;

        info!(user_id = %user_id, item_id = %copy.id, stock = copy.stock, "Edit committed");
        Ok(true)
    }

    fn take_commit(&self, state: &mut EngineState) -> InventoryResult<Option<(UserId, WorkingCopy)>> {
        let Some(copy) = state.session.working_copy() else {
            return Ok(None);
        };
        copy.validate(&self.config.validation)?;
        let user_id = state.active_user()?;

        Ok(state.session.take().map(|copy| (user_id, copy)))
    }

    /// Discards the working copy. No-op when none is open.
    pub fn cancel_edit(&self) {
        if let Some(copy) = self.lock().session.take() {
            debug!(item_id = %copy.id, "Edit session cancelled");
        }
    }
}

impl Drop for InventoryEngine {
    fn drop(&mut self) {
        let subscription = self.lock().subscription.take();
        if let Some(subscription) = subscription {
            self.collection.unsubscribe(subscription);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::memory::{CollectionCall, DeliveryMode, InMemoryCollection};
    use async_trait::async_trait;
    use restock_core::{ItemPatch, ItemRecord, PriorityStatus, ValidationRules};
    use serde_json::json;

    fn engine_over(memory: &Arc<InMemoryCollection>) -> InventoryEngine {
        InventoryEngine::new(memory.clone())
    }

    async fn started(mode: DeliveryMode) -> (Arc<InMemoryCollection>, InventoryEngine) {
        let memory = Arc::new(InMemoryCollection::with_mode(mode));
        let engine = engine_over(&memory);
        engine.start("u1").await.unwrap();
        memory.flush();
        memory.clear_calls();
        (memory, engine)
    }

    fn raw_item(name: &str, stock: i64, min: i64, max: i64) -> serde_json::Value {
        json!({ "name": name, "stock": stock, "min": min, "max": max })
    }

    fn user() -> UserId {
        UserId::from("u1")
    }

    #[derive(Default)]
    struct RecordingEmitter {
        snapshots: Mutex<Vec<Vec<ItemView>>>,
        errors: Mutex<Vec<ErrorKind>>,
    }

    impl InventoryEventEmitter for RecordingEmitter {
        fn emit_snapshot(&self, items: &[ItemView]) {
            self.snapshots.lock().unwrap().push(items.to_vec());
        }

        fn emit_error(&self, error: &InventoryError) {
            self.errors.lock().unwrap().push(error.kind());
        }
    }

    /// Keeps listeners after unsubscribe, like a store with in-flight deliveries.
    #[derive(Default)]
    struct LeakyCollection {
        listeners: Mutex<Vec<SnapshotListener>>,
    }

    #[async_trait]
    impl RemoteCollection for LeakyCollection {
        async fn subscribe(&self, _user_id: &UserId, listener: SnapshotListener) -> crate::RemoteResult<SubscriptionId> {
            let mut listeners = self.listeners.lock().unwrap();
            listeners.push(listener);
            Ok(SubscriptionId::new(listeners.len() as u64))
        }

        fn unsubscribe(&self, _subscription: SubscriptionId) {}

        async fn insert(&self, _user_id: &UserId, _record: &ItemRecord) -> crate::RemoteResult<String> {
            Ok("k1".into())
        }

        async fn update(&self, _user_id: &UserId, _id: &str, _patch: &ItemPatch) -> crate::RemoteResult<()> {
            Ok(())
        }

        async fn delete(&self, _user_id: &UserId, _id: &str) -> crate::RemoteResult<()> {
            Ok(())
        }
    }

    // -------------------------------------------------------------------------
    // Snapshot and priority status
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_priority_status_boundaries() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Low", 5, 10, 20));
        memory.put_raw(&user(), "b", raw_item("Mid", 15, 10, 20));
        memory.put_raw(&user(), "c", raw_item("Top", 20, 10, 20));
        memory.put_raw(&user(), "d", raw_item("Over", 21, 10, 20));

        let statuses: Vec<_> = engine.list_items().into_iter().map(|v| v.priority_status).collect();
        assert_eq!(
            statuses,
            vec![
                PriorityStatus::HighPriority,
                PriorityStatus::Normal,
                PriorityStatus::Normal,
                PriorityStatus::HighPriority,
            ]
        );
        assert_eq!(engine.status().high_priority_count, 2);
    }

    #[tokio::test]
    async fn test_redelivery_leaves_items_unchanged() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));

        let before = engine.list_items();
        let applied = engine.status().snapshots_applied;
        memory.redeliver(&user());

        assert_eq!(engine.list_items(), before);
        assert_eq!(engine.status().snapshots_applied, applied + 1);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "good", raw_item("Bolt", 1, 0, 5));
        memory.put_raw(&user(), "bad", json!("garbage"));
        memory.put_raw(&user(), "partial", json!({ "name": "Nut", "stock": "ten" }));

        let items = engine.list_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "good");
        assert_eq!(engine.status().skipped_records, 2);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_double_start_keeps_one_subscription() {
        let memory = Arc::new(InMemoryCollection::new());
        let engine = engine_over(&memory);

        engine.start("u1").await.unwrap();
        engine.start("u1").await.unwrap();

        assert_eq!(memory.subscriber_count(), 1);
        let subscribes = memory
            .calls()
            .iter()
            .filter(|c| matches!(c, CollectionCall::Subscribe { .. }))
            .count();
        assert_eq!(subscribes, 1);
    }

    #[tokio::test]
    async fn test_start_other_user_switches_collection() {
        let memory = Arc::new(InMemoryCollection::new());
        memory.put_raw(&UserId::from("u1"), "a", raw_item("Bolt", 1, 0, 5));
        memory.put_raw(&UserId::from("u2"), "b", raw_item("Nut", 1, 0, 5));

        let engine = engine_over(&memory);
        engine.start("u1").await.unwrap();
        engine.begin_edit("a").unwrap();

        engine.start("u2").await.unwrap();
        let items = engine.list_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "b");
        assert!(engine.edit_session().is_none());
        assert_eq!(memory.subscriber_count(), 1);
        assert_eq!(engine.status().user_id, Some(UserId::from("u2")));
    }

    #[tokio::test]
    async fn test_stop_clears_state_and_is_repeatable() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));
        engine.begin_edit("a").unwrap();

        engine.stop();
        engine.stop();

        assert!(!engine.is_started());
        assert!(engine.list_items().is_empty());
        assert!(engine.edit_session().is_none());
        assert_eq!(memory.subscriber_count(), 0);

        memory.put_raw(&user(), "b", raw_item("Nut", 1, 0, 5));
        assert!(engine.list_items().is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let memory = Arc::new(InMemoryCollection::new());
        let engine = engine_over(&memory);
        engine.stop();
        assert!(memory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_late_delivery_after_stop_is_ignored() {
        let leaky = Arc::new(LeakyCollection::default());
        let engine = InventoryEngine::new(leaky.clone());
        engine.start("u1").await.unwrap();

        let listener = leaky.listeners.lock().unwrap()[0].clone();
        let mut raw = RawSnapshot::new();
        raw.insert("a".into(), raw_item("Bolt", 1, 0, 5));

        listener(raw.clone());
        assert_eq!(engine.list_items().len(), 1);

        engine.stop();
        listener(raw.clone());
        assert!(engine.list_items().is_empty());

        engine.start("u1").await.unwrap();
        listener(raw);
        assert!(engine.list_items().is_empty());
    }

    #[tokio::test]
    async fn test_blank_user_is_rejected() {
        let memory = Arc::new(InMemoryCollection::new());
        let engine = engine_over(&memory);

        let err = engine.start("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);
        assert!(memory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_failure_leaves_engine_stopped() {
        let memory = Arc::new(InMemoryCollection::new());
        memory.fail_next(RemoteError::PermissionDenied("rules".into()));
        let engine = engine_over(&memory);

        let err = engine.start("u1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert!(!engine.is_started());
        assert_eq!(engine.status().user_id, None);

        engine.start("u1").await.unwrap();
        assert!(engine.is_started());
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let memory = Arc::new(InMemoryCollection::new());
        {
            let engine = engine_over(&memory);
            engine.start("u1").await.unwrap();
            assert_eq!(memory.subscriber_count(), 1);
        }
        assert_eq!(memory.subscriber_count(), 0);
    }

    // -------------------------------------------------------------------------
    // Add / delete
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_waits_for_delivery() {
        let (memory, engine) = started(DeliveryMode::Manual).await;

        let id = engine.add_item(NewItem::new("Bolt", 5, 0, 10)).await.unwrap();
        assert_eq!(
            memory.writes(),
            vec![CollectionCall::Insert {
                user_id: user(),
                record: ItemRecord {
                    name: "Bolt".into(),
                    stock: 5,
                    min: 0,
                    max: 10,
                    link: None,
                },
            }]
        );
        assert!(engine.list_items().is_empty());

        memory.flush();
        let items = engine.list_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_case_insensitive() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        engine.add_item(NewItem::new("Widget", 3, 1, 10)).await.unwrap();

        let err = engine.add_item(NewItem::new(" widget ", 1, 0, 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(memory.writes().len(), 1);
        assert_eq!(engine.last_error(), Some(ErrorKind::DuplicateName));
    }

    #[tokio::test]
    async fn test_invalid_candidates_make_no_calls() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;

        let err = engine.add_item(NewItem::new("", 1, 0, 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);

        let err = engine.add_item(NewItem::new("Bolt", 1, 0, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);

        let err = engine.add_item(NewItem::new("Bolt", -1, 0, 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);

        assert!(memory.writes().is_empty());
        assert_eq!(engine.last_error(), Some(ErrorKind::InvalidFields));
    }

    #[tokio::test]
    async fn test_successful_add_clears_last_error() {
        let (_memory, engine) = started(DeliveryMode::Immediate).await;
        engine.add_item(NewItem::new("", 1, 0, 5)).await.unwrap_err();
        assert!(engine.last_error().is_some());

        engine.add_item(NewItem::new("Bolt", 1, 0, 5)).await.unwrap();
        assert_eq!(engine.last_error(), None);
    }

    #[tokio::test]
    async fn test_inverted_thresholds_follow_config() {
        let memory = Arc::new(InMemoryCollection::new());
        let permissive = engine_over(&memory);
        permissive.start("u1").await.unwrap();
        assert!(permissive.add_item(NewItem::new("Bolt", 1, 10, 5)).await.is_ok());

        let mut config = EngineConfig::default();
        config.validation = ValidationRules {
            enforce_min_le_max: true,
            ..Default::default()
        };
        let strict = InventoryEngine::with_config(memory.clone(), config);
        strict.start("u2").await.unwrap();
        let err = strict.add_item(NewItem::new("Nut", 1, 10, 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);
    }

    #[tokio::test]
    async fn test_add_remote_failure() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.fail_next(RemoteError::Network("reset".into()));

        let err = engine.add_item(NewItem::new("Bolt", 1, 0, 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert!(err.is_retryable());
        assert!(engine.list_items().is_empty());
        assert_eq!(engine.last_error(), Some(ErrorKind::RemoteFailure));
    }

    #[tokio::test]
    async fn test_mutations_before_start() {
        let memory = Arc::new(InMemoryCollection::new());
        let engine = engine_over(&memory);

        let err = engine.add_item(NewItem::new("Bolt", 1, 0, 5)).await.unwrap_err();
        assert_eq!(err, InventoryError::NotStarted);
        assert_eq!(engine.delete_item("a").await.unwrap_err(), InventoryError::NotStarted);
        assert_eq!(engine.begin_edit("a").unwrap_err(), InventoryError::NotStarted);
        assert!(memory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_still_calls_remote() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;

        engine.delete_item("nope").await.unwrap();
        assert_eq!(
            memory.writes(),
            vec![CollectionCall::Delete {
                user_id: user(),
                id: "nope".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_delete_blank_id_is_rejected() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        let err = engine.delete_item(" ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);
        assert!(memory.writes().is_empty());
    }

    // -------------------------------------------------------------------------
    // Edit session
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_begin_and_cancel_make_no_calls() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));

        engine.begin_edit("a").unwrap();
        engine.update_edit_field(EditField::Stock(4)).unwrap();
        engine.cancel_edit();
        engine.cancel_edit();

        assert!(memory.calls().is_empty());
        assert!(engine.edit_session().is_none());
    }

    #[tokio::test]
    async fn test_commit_sends_one_update() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 5, 10, 20));

        engine.begin_edit("a").unwrap();
        engine.update_edit_field(EditField::Stock(50)).unwrap();
        assert!(engine.commit_edit().await.unwrap());

        let writes = memory.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            CollectionCall::Update { id, patch, .. } => {
                assert_eq!(id, "a");
                assert_eq!(patch.stock, Some(50));
            }
            other => panic!("unexpected call: {other:?}"),
        }
        assert!(engine.edit_session().is_none());
        assert_eq!(engine.list_items()[0].priority_status, PriorityStatus::HighPriority);
        assert_eq!(engine.list_items()[0].stock, 50);
    }

    #[tokio::test]
    async fn test_commit_without_session() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        assert!(!engine.commit_edit().await.unwrap());
        assert!(memory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_begin_unknown_id() {
        let (_memory, engine) = started(DeliveryMode::Immediate).await;
        let err = engine.begin_edit("missing").unwrap_err();
        assert_eq!(err, InventoryError::NotFound { id: "missing".into() });
        assert_eq!(engine.last_error(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_update_without_session() {
        let (_memory, engine) = started(DeliveryMode::Immediate).await;
        let err = engine.update_edit_field(EditField::Stock(1)).unwrap_err();
        assert_eq!(err, InventoryError::NoActiveEdit);

        let err = engine.update_edit_field_text("stock", "lots").unwrap_err();
        assert_eq!(err, InventoryError::NoActiveEdit);
        assert_eq!(engine.last_error(), Some(ErrorKind::NoActiveEdit));
    }

    #[tokio::test]
    async fn test_second_begin_replaces_working_copy() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));
        memory.put_raw(&user(), "b", raw_item("Nut", 2, 0, 5));

        engine.begin_edit("a").unwrap();
        engine.update_edit_field(EditField::Stock(3)).unwrap();
        engine.begin_edit("b").unwrap();

        let copy = engine.edit_session().unwrap();
        assert_eq!(copy.id, "b");
        assert_eq!(copy.stock, 2);
    }

    #[tokio::test]
    async fn test_commit_with_default_rules_sends_any_copy() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));

        engine.begin_edit("a").unwrap();
        engine.update_edit_field(EditField::Name(String::new())).unwrap();
        engine.update_edit_field(EditField::Stock(-1)).unwrap();
        assert!(engine.commit_edit().await.unwrap());

        let writes = memory.writes();
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            CollectionCall::Update { id, patch, .. } => {
                assert_eq!(id, "a");
                assert_eq!(patch.name.as_deref(), Some(""));
                assert_eq!(patch.stock, Some(-1));
            }
            other => panic!("unexpected call: {other:?}"),
        }
        assert!(engine.edit_session().is_none());
        assert!(!engine.status().is_editing);
    }

    #[tokio::test]
    async fn test_invalid_commit_keeps_session_open() {
        let memory = Arc::new(InMemoryCollection::new());
        let mut config = EngineConfig::default();
        config.validation.validate_on_commit = true;
        let engine = InventoryEngine::with_config(memory.clone(), config);
        engine.start("u1").await.unwrap();
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));

        engine.begin_edit("a").unwrap();
        engine.update_edit_field_text("stock", "-1").unwrap();
        let err = engine.commit_edit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidFields);
        assert!(memory.writes().is_empty());
        assert_eq!(engine.edit_session().map(|c| c.stock), Some(-1));
    }

    #[tokio::test]
    async fn test_unparseable_field_text() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));
        engine.begin_edit("a").unwrap();

        let err = engine.update_edit_field_text("stock", "lots").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFields);
        assert_eq!(engine.edit_session().map(|c| c.stock), Some(1));
    }

    #[tokio::test]
    async fn test_commit_remote_failure_closes_session() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));
        engine.begin_edit("a").unwrap();
        engine.update_edit_field(EditField::Name("Hex bolt".into())).unwrap();

        memory.fail_next(RemoteError::QuotaExceeded("writes".into()));
        let err = engine.commit_edit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert!(engine.edit_session().is_none());
        assert_eq!(engine.list_items()[0].name, "Bolt");
    }

    #[tokio::test]
    async fn test_commit_after_item_deleted_remotely() {
        let (memory, engine) = started(DeliveryMode::Immediate).await;
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 0, 5));
        engine.begin_edit("a").unwrap();

        engine.delete_item("a").await.unwrap();
        let err = engine.commit_edit().await.unwrap_err();
        assert_eq!(
            err,
            InventoryError::RemoteFailure(RemoteError::RecordNotFound { id: "a".into() })
        );
    }

    // -------------------------------------------------------------------------
    // Emitter and status
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_emitter_receives_snapshots_and_errors() {
        let memory = Arc::new(InMemoryCollection::new());
        let emitter = Arc::new(RecordingEmitter::default());
        let engine = InventoryEngine::with_emitter(memory.clone(), EngineConfig::default(), emitter.clone());

        engine.start("u1").await.unwrap();
        engine.add_item(NewItem::new("Bolt", 1, 0, 5)).await.unwrap();
        engine.update_edit_field(EditField::Stock(1)).unwrap_err();

        let snapshots = emitter.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].is_empty());
        assert_eq!(snapshots[1][0].name, "Bolt");
        assert_eq!(*emitter.errors.lock().unwrap(), vec![ErrorKind::NoActiveEdit]);
    }

    #[tokio::test]
    async fn test_status_reports_engine_state() {
        let memory = Arc::new(InMemoryCollection::new());
        let engine = engine_over(&memory);
        assert_eq!(engine.status(), EngineStatus::default());

        engine.start("u1").await.unwrap();
        memory.put_raw(&user(), "a", raw_item("Bolt", 1, 2, 5));
        engine.begin_edit("a").unwrap();

        let status = engine.status();
        assert!(status.is_started);
        assert_eq!(status.item_count, 1);
        assert_eq!(status.high_priority_count, 1);
        assert_eq!(status.snapshots_applied, 2);
        assert!(status.last_snapshot_at.is_some());
        assert!(status.is_editing);
        assert_eq!(status.last_error, None);
    }

    #[tokio::test]
    async fn test_retry_config_wraps_collection() {
        let memory = Arc::new(InMemoryCollection::new());
        let mut config = EngineConfig::default();
        config.retry.enabled = true;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_secs = 0;

        let engine = InventoryEngine::with_config(memory.clone(), config);
        engine.start("u1").await.unwrap();
        memory.fail_next(RemoteError::Unavailable("busy".into()));

        engine.add_item(NewItem::new("Bolt", 1, 0, 5)).await.unwrap();
        assert_eq!(engine.list_items().len(), 1);
        assert_eq!(memory.writes().len(), 2);
    }
}
