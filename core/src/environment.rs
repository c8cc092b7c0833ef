//! Injected dependencies.
//!
//! Everything the lifecycle needs from the outside world sits behind a trait
//! here: time, the document store, the post service, the notification
//! service, and the deadline ledger. Production adapters live in
//! `sponsorlink-postgres`; in-memory doubles live in `sponsorlink-testing`.
//!
//! The async traits are dyn-compatible. Methods return boxed futures so the
//! runtime can hold `Arc<dyn CollaborationStore>` and share it across tasks.

use crate::deadline::DeadlineLedger;
use crate::error::{LedgerError, NotificationError, PostLookupError, StoreError};
use crate::ids::{CollaborationId, PostId, UserId};
use crate::notification::Notification;
use crate::types::{
    CollaborationDraft, CollaborationRequest, CollaborationStatus, PostSummary,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future returned by the environment traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Clock trait - abstracts time so transitions and deadline scans are
/// deterministic under test.
///
/// # Example
///
/// ```
/// use sponsorlink_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert_eq!(clock.today(), clock.now().date_naive());
/// ```
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Equality filters for [`CollaborationStore::find`].
///
/// Unset filters match everything. An empty status list matches every
/// status; a non-empty one matches any of the listed statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollaborationQuery {
    /// Match on post
    pub post_id: Option<PostId>,
    /// Match on requester
    pub requester_id: Option<UserId>,
    /// Match on receiver
    pub receiver_id: Option<UserId>,
    /// Match any of these statuses
    pub statuses: Vec<CollaborationStatus>,
}

impl CollaborationQuery {
    /// Query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one post.
    #[must_use]
    pub fn post(mut self, post_id: PostId) -> Self {
        self.post_id = Some(post_id);
        self
    }

    /// Restrict to one requester.
    #[must_use]
    pub fn requester(mut self, requester_id: UserId) -> Self {
        self.requester_id = Some(requester_id);
        self
    }

    /// Restrict to one receiver.
    #[must_use]
    pub fn receiver(mut self, receiver_id: UserId) -> Self {
        self.receiver_id = Some(receiver_id);
        self
    }

    /// Add a status to the accepted set.
    #[must_use]
    pub fn status(mut self, status: CollaborationStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    /// Replace the accepted status set.
    #[must_use]
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = CollaborationStatus>) -> Self {
        self.statuses.clear();
        for status in statuses {
            self = self.status(status);
        }
        self
    }

    /// Whether `record` satisfies every filter.
    #[must_use]
    pub fn matches(&self, record: &CollaborationRequest) -> bool {
        self.post_id.as_ref().is_none_or(|id| &record.post_id == id)
            && self
                .requester_id
                .as_ref()
                .is_none_or(|id| &record.requester_id == id)
            && self
                .receiver_id
                .as_ref()
                .is_none_or(|id| &record.receiver_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&record.status()))
    }
}

/// Collection of collaboration records.
///
/// Each call is an independent single-document operation; the store makes no
/// multi-document transaction guarantees.
pub trait CollaborationStore: Send + Sync {
    /// Persist a new `Pending` record and assign its id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicatePending`] if a pending record already exists
    ///   for the same post and requester
    /// - [`StoreError::Unavailable`] if the write fails
    fn insert(
        &self,
        draft: CollaborationDraft,
    ) -> BoxFuture<'_, Result<CollaborationRequest, StoreError>>;

    /// Point read by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn get(
        &self,
        id: &CollaborationId,
    ) -> BoxFuture<'_, Result<Option<CollaborationRequest>, StoreError>>;

    /// Replace a record, conditional on its stored status being `expected`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Conflict`] if the stored status differs from `expected`
    /// - [`StoreError::NotFound`] if the record does not exist
    /// - [`StoreError::Unavailable`] if the write fails
    fn update(
        &self,
        record: CollaborationRequest,
        expected: CollaborationStatus,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Records matching `query`, newest `createdAt` first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find(
        &self,
        query: CollaborationQuery,
    ) -> BoxFuture<'_, Result<Vec<CollaborationRequest>, StoreError>>;
}

/// Read-only lookup into the post service.
pub trait PostDirectory: Send + Sync {
    /// Look up a post, returning `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PostLookupError`] if the post service fails.
    fn get_post(
        &self,
        post_id: &PostId,
    ) -> BoxFuture<'_, Result<Option<PostSummary>, PostLookupError>>;
}

/// Fire-and-forget delivery to the notification service.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] if delivery fails. Callers log and
    /// continue.
    fn send(&self, notification: Notification) -> BoxFuture<'_, Result<(), NotificationError>>;
}

/// Persistence for the deadline monitor's last-notified thresholds.
pub trait DeadlineLedgerStore: Send + Sync {
    /// Load the ledger, or an empty one if none was saved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if loading fails.
    fn load(&self) -> BoxFuture<'_, Result<DeadlineLedger, LedgerError>>;

    /// Replace the saved ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if saving fails.
    fn save(&self, ledger: &DeadlineLedger) -> BoxFuture<'_, Result<(), LedgerError>>;
}
