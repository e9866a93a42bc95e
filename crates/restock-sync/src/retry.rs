//! # Retrying Collection
//!
//! Wraps any [`RemoteCollection`] and repeats calls that fail with a
//! retryable [`RemoteError`], waiting with exponential backoff between
//! attempts.
//!
//! ```text
//! attempt 1 ──✗ Network──► wait ~initial ──► attempt 2 ──✗──► wait ×1.5 ──► ...
//!     │                                                                    │
//!     └─ ✗ PermissionDenied / QuotaExceeded / RecordNotFound / Codec ──────┴─► Err
//!
//! Gives up after `max_retries` retries or `max_elapsed_secs`, whichever
//! comes first, and returns the last error.
//! ```
//!
//! `unsubscribe` is never retried. Inserts are retried as-is; a retry after
//! a lost acknowledgement can create a second record.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use restock_core::{ItemPatch, ItemRecord, UserId};

use crate::collection::{RemoteCollection, SnapshotListener, SubscriptionId};
use crate::error::{RemoteError, RemoteResult};

// =============================================================================
// Settings
// =============================================================================

/// Retry behavior for remote calls (`[retry]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Wrap the remote collection in a [`RetryingCollection`].
    #[serde(default)]
    pub enabled: bool,

    /// First wait (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Longest single wait (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Total time budget across attempts (seconds).
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_initial_backoff() -> u64 {
    200
}
fn default_max_backoff() -> u64 {
    5
}
fn default_max_elapsed() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            enabled: false,
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_elapsed_secs: default_max_elapsed(),
            max_retries: default_max_retries(),
        }
    }
}

impl RetrySettings {
    /// Backoff policy for one call.
    pub fn policy(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.initial_backoff_ms);
        ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            max_interval: Duration::from_secs(self.max_backoff_secs).max(initial),
            max_elapsed_time: Some(Duration::from_secs(self.max_elapsed_secs)),
            ..Default::default()
        }
    }
}

// =============================================================================
// Retrying Collection
// =============================================================================

/// A [`RemoteCollection`] that retries transient failures of `inner`.
pub struct RetryingCollection {
    inner: Arc<dyn RemoteCollection>,
    settings: RetrySettings,
}

impl RetryingCollection {
    pub fn new(inner: Arc<dyn RemoteCollection>, settings: RetrySettings) -> Self {
        RetryingCollection { inner, settings }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> RemoteResult<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = RemoteResult<T>> + Send,
    {
        let max_retries = self.settings.max_retries;
        let mut attempt: u32 = 0;

        backoff::future::retry(self.settings.policy(), || {
            attempt += 1;
            let current = attempt;
            let pending = call();
            async move {
                pending.await.map_err(|err| classify(operation, current, max_retries, err))
            }
        })
        .await
    }
}

fn classify(operation: &str, attempt: u32, max_retries: u32, err: RemoteError) -> backoff::Error<RemoteError> {
    if err.is_retryable() && attempt <= max_retries {
        warn!(operation, attempt, error = %err, "Remote call failed, retrying");
        backoff::Error::transient(err)
    } else {
        debug!(operation, attempt, error = %err, "Remote call failed");
        backoff::Error::permanent(err)
    }
}

#[async_trait]
impl RemoteCollection for RetryingCollection {
    async fn subscribe(&self, user_id: &UserId, listener: SnapshotListener) -> RemoteResult<SubscriptionId> {
        self.run("subscribe", || self.inner.subscribe(user_id, listener.clone()))
            .await
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.inner.unsubscribe(subscription);
    }

    async fn insert(&self, user_id: &UserId, record: &ItemRecord) -> RemoteResult<String> {
        self.run("insert", || self.inner.insert(user_id, record)).await
    }

    async fn update(&self, user_id: &UserId, id: &str, patch: &ItemPatch) -> RemoteResult<()> {
        self.run("update", || self.inner.update(user_id, id, patch)).await
    }

    async fn delete(&self, user_id: &UserId, id: &str) -> RemoteResult<()> {
        self.run("delete", || self.inner.delete(user_id, id)).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
