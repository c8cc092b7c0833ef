//! In-memory environment implementations
//!
//! Provides fast, deterministic test doubles for every environment trait:
//! - [`InMemoryCollaborationStore`]: HashMap-based document store
//! - [`InMemoryPostDirectory`]: fixed set of posts
//! - [`RecordingNotificationSink`]: captures notifications
//! - [`InMemoryDeadlineLedger`]: ledger persistence
//!
//! Each double can be told to fail so tests can cover dependency errors.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use sponsorlink_core::deadline::DeadlineLedger;
use sponsorlink_core::environment::{
    BoxFuture, CollaborationQuery, CollaborationStore, DeadlineLedgerStore, NotificationSink,
    PostDirectory,
};
use sponsorlink_core::error::{LedgerError, NotificationError, PostLookupError, StoreError};
use sponsorlink_core::ids::{CollaborationId, PostId, UserId};
use sponsorlink_core::listing::sort_newest_first;
use sponsorlink_core::notification::Notification;
use sponsorlink_core::types::{
    CollaborationDraft, CollaborationRequest, CollaborationStatus, PostSummary,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory collaboration store for fast, deterministic testing.
///
/// Ids are assigned sequentially as `collab-1`, `collab-2`, ...
///
/// # Example
///
/// ```
/// use sponsorlink_testing::InMemoryCollaborationStore;
/// use sponsorlink_testing::fixtures::pending_request;
/// use sponsorlink_core::environment::CollaborationStore;
/// use sponsorlink_core::ids::CollaborationId;
/// use chrono::Utc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryCollaborationStore::new();
/// store.seed(pending_request("c1", Utc::now()));
///
/// let record = store.get(&CollaborationId::new("c1")).await?;
/// assert!(record.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryCollaborationStore {
    records: Arc<RwLock<HashMap<CollaborationId, CollaborationRequest>>>,
    next_id: Arc<AtomicU64>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    conflict_next_update: Arc<AtomicBool>,
}

impl InMemoryCollaborationStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing id assignment.
    pub fn seed(&self, record: CollaborationRequest) {
        self.records.write().unwrap().insert(record.id.clone(), record);
    }

    /// Snapshot of a stored record.
    #[must_use]
    pub fn record(&self, id: &CollaborationId) -> Option<CollaborationRequest> {
        self.records.read().unwrap().get(id).cloned()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    /// Make `get` and `find` fail with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `insert` and `update` fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `update` report a [`StoreError::Conflict`], as if another
    /// writer changed the record between read and write.
    pub fn conflict_next_update(&self) {
        self.conflict_next_update.store(true, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CollaborationStore for InMemoryCollaborationStore {
    fn insert(
        &self,
        draft: CollaborationDraft,
    ) -> BoxFuture<'_, Result<CollaborationRequest, StoreError>> {
        Box::pin(async move {
            Self::check(&self.fail_writes)?;
            let mut records = self.records.write().unwrap();
            let duplicate = records.values().any(|existing| {
                existing.status() == CollaborationStatus::Pending
                    && existing.post_id == draft.post_id
                    && existing.requester_id == draft.requester_id
            });
            if duplicate {
                return Err(StoreError::DuplicatePending {
                    post_id: draft.post_id,
                    requester_id: draft.requester_id,
                });
            }

            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let record = CollaborationRequest::from_draft(
                CollaborationId::new(format!("collab-{n}")),
                draft,
            );
            records.insert(record.id.clone(), record.clone());
            Ok(record)
        })
    }

    fn get(
        &self,
        id: &CollaborationId,
    ) -> BoxFuture<'_, Result<Option<CollaborationRequest>, StoreError>> {
        let id = id.clone();
        Box::pin(async move {
            Self::check(&self.fail_reads)?;
            Ok(self.record(&id))
        })
    }

    fn update(
        &self,
        record: CollaborationRequest,
        expected: CollaborationStatus,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            Self::check(&self.fail_writes)?;
            if self.conflict_next_update.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Conflict {
                    id: record.id,
                    expected,
                });
            }

            let mut records = self.records.write().unwrap();
            let Some(stored) = records.get_mut(&record.id) else {
                return Err(StoreError::NotFound(record.id));
            };
            if stored.status() != expected {
                return Err(StoreError::Conflict {
                    id: record.id,
                    expected,
                });
            }
            *stored = record;
            Ok(())
        })
    }

    fn find(
        &self,
        query: CollaborationQuery,
    ) -> BoxFuture<'_, Result<Vec<CollaborationRequest>, StoreError>> {
        Box::pin(async move {
            Self::check(&self.fail_reads)?;
            let mut matching: Vec<_> = self
                .records
                .read()
                .unwrap()
                .values()
                .filter(|record| query.matches(record))
                .cloned()
                .collect();
            sort_newest_first(&mut matching);
            Ok(matching)
        })
    }
}

/// Post directory backed by a fixed map of posts.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPostDirectory {
    posts: Arc<RwLock<HashMap<PostId, PostSummary>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryPostDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `posts`.
    #[must_use]
    pub fn with_posts(posts: impl IntoIterator<Item = PostSummary>) -> Self {
        let directory = Self::new();
        for post in posts {
            directory.add(post);
        }
        directory
    }

    /// Add or replace a post.
    pub fn add(&self, post: PostSummary) {
        self.posts.write().unwrap().insert(post.post_id.clone(), post);
    }

    /// Make lookups fail with [`PostLookupError::Unavailable`].
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl PostDirectory for InMemoryPostDirectory {
    fn get_post(
        &self,
        post_id: &PostId,
    ) -> BoxFuture<'_, Result<Option<PostSummary>, PostLookupError>> {
        let post_id = post_id.clone();
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PostLookupError::Unavailable("injected failure".to_string()));
            }
            Ok(self.posts.read().unwrap().get(&post_id).cloned())
        })
    }
}

/// Notification sink that records what it was asked to deliver.
///
/// # Example
///
/// ```
/// use sponsorlink_testing::RecordingNotificationSink;
/// use sponsorlink_core::environment::NotificationSink;
/// use sponsorlink_core::ids::{CollaborationId, UserId};
/// use sponsorlink_core::notification::Notification;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = RecordingNotificationSink::new();
/// sink.send(Notification::expiring(UserId::new("u2"), CollaborationId::new("c1"), "Fair", 7)).await?;
/// assert_eq!(sink.sent_to(&UserId::new("u2")).len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Arc<RwLock<Vec<Notification>>>,
    attempts: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotificationSink {
    /// Create a sink that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that rejects everything
    #[must_use]
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.fail(true);
        sink
    }

    /// Toggle delivery failure.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Notifications delivered so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.read().unwrap().clone()
    }

    /// Notifications delivered to `recipient`.
    #[must_use]
    pub fn sent_to(&self, recipient: &UserId) -> Vec<Notification> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|n| &n.recipient_id == recipient)
            .cloned()
            .collect()
    }

    /// Delivery attempts, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Forget everything delivered so far.
    pub fn clear(&self) {
        self.sent.write().unwrap().clear();
        self.attempts.store(0, Ordering::SeqCst);
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn send(&self, notification: Notification) -> BoxFuture<'_, Result<(), NotificationError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(NotificationError::Delivery("injected failure".to_string()));
            }
            self.sent.write().unwrap().push(notification);
            Ok(())
        })
    }
}

/// In-memory deadline ledger persistence.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDeadlineLedger {
    ledger: Arc<RwLock<DeadlineLedger>>,
    saves: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl InMemoryDeadlineLedger {
    /// Create an empty ledger store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the saved ledger.
    #[must_use]
    pub fn snapshot(&self) -> DeadlineLedger {
        self.ledger.read().unwrap().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make load and save fail with [`LedgerError::Storage`].
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(LedgerError::Storage("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DeadlineLedgerStore for InMemoryDeadlineLedger {
    fn load(&self) -> BoxFuture<'_, Result<DeadlineLedger, LedgerError>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.snapshot())
        })
    }

    fn save(&self, ledger: &DeadlineLedger) -> BoxFuture<'_, Result<(), LedgerError>> {
        let ledger = ledger.clone();
        Box::pin(async move {
            self.check()?;
            *self.ledger.write().unwrap() = ledger;
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
