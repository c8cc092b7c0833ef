//! Error taxonomy for collaboration operations.
//!
//! Every failure an operation can report maps onto one [`ErrorKind`]. Adapter
//! failures (store, notification sink, post lookup, deadline ledger) have
//! their own error types and fold into [`CollaborationError::Dependency`].

use crate::ids::{CollaborationId, PostId, UserId};
use crate::types::CollaborationStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification reported to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or malformed input
    ValidationError,
    /// Caller does not hold the role the action requires
    AuthorizationError,
    /// Request or post id did not resolve
    NotFoundError,
    /// Action is not legal from the current status
    InvalidStateTransition,
    /// Store, notification, or lookup dependency failed
    DependencyError,
}

impl ErrorKind {
    /// Name used in metrics labels and the outcome envelope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "ValidationError",
            Self::AuthorizationError => "AuthorizationError",
            Self::NotFoundError => "NotFoundError",
            Self::InvalidStateTransition => "InvalidStateTransition",
            Self::DependencyError => "DependencyError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by collaboration operations.
#[derive(Error, Debug)]
pub enum CollaborationError {
    /// Missing or malformed input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Caller does not hold the required role.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Referenced request or post does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Action is not legal from the record's current status.
    #[error("Cannot {action} collaboration {id} from status {from}")]
    InvalidStateTransition {
        /// Record the action targeted
        id: CollaborationId,
        /// Status the record was in
        from: CollaborationStatus,
        /// Name of the rejected action
        action: &'static str,
    },

    /// A dependency call failed.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

impl CollaborationError {
    /// Taxonomy entry for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Authorization(_) => ErrorKind::AuthorizationError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::Dependency(_) => ErrorKind::DependencyError,
        }
    }
}

impl From<StoreError> for CollaborationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicatePending { .. } => Self::Validation("duplicate request".to_string()),
            other => Self::Dependency(DependencyError::Store(other)),
        }
    }
}

impl From<PostLookupError> for CollaborationError {
    fn from(error: PostLookupError) -> Self {
        Self::Dependency(DependencyError::PostLookup(error))
    }
}

impl From<LedgerError> for CollaborationError {
    fn from(error: LedgerError) -> Self {
        Self::Dependency(DependencyError::Ledger(error))
    }
}

/// Failure of an external dependency.
#[derive(Error, Debug)]
pub enum DependencyError {
    /// Document store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Notification service failure.
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Post service failure.
    #[error("Post lookup error: {0}")]
    PostLookup(#[from] PostLookupError),

    /// Deadline ledger persistence failure.
    #[error("Deadline ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors raised by a [`CollaborationStore`](crate::environment::CollaborationStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store unreachable or query failed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Conditional update found the record in a different status.
    #[error("Record {id} is no longer {expected}")]
    Conflict {
        /// Record being updated
        id: CollaborationId,
        /// Status the update was conditioned on
        expected: CollaborationStatus,
    },

    /// Record to update does not exist.
    #[error("Record not found: {0}")]
    NotFound(CollaborationId),

    /// Insert would create a second pending request for the same post and
    /// requester.
    #[error("Pending request already exists for post {post_id} from {requester_id}")]
    DuplicatePending {
        /// Post of the rejected insert
        post_id: PostId,
        /// Requester of the rejected insert
        requester_id: UserId,
    },
}

/// Errors raised by a [`NotificationSink`](crate::environment::NotificationSink).
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Notification service rejected or failed the call.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Errors raised by a [`PostDirectory`](crate::environment::PostDirectory).
#[derive(Error, Debug)]
pub enum PostLookupError {
    /// Post service unreachable or failed.
    #[error("Post service unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a [`DeadlineLedgerStore`](crate::environment::DeadlineLedgerStore).
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Ledger storage failed.
    #[error("Ledger storage failed: {0}")]
    Storage(String),

    /// Ledger could not be (de)serialized.
    #[error("Ledger serialization failed: {0}")]
    Serialization(String),
}
