//! # Sponsorlink Core
//!
//! Domain model for the collaboration lifecycle between student clubs and
//! enterprise sponsors.
//!
//! A club (the requester) asks the author of a demand post (the receiver) to
//! collaborate. The receiver accepts or rejects; once accepted either party
//! can cancel or start completion, and the other party closes it out with a
//! review.
//!
//! ## Core Concepts
//!
//! - **State**: a [`CollaborationRequest`] whose [`CollaborationPhase`] carries only
//!   the fields valid for its status
//! - **Action**: a [`CollaborationAction`] requested by one of the parties
//! - **Reducer**: [`CollaborationReducer`], a pure `(State, Action, Environment) → Effects`
//!   function enforcing the transition table
//! - **Effect**: a [`Notification`] description, never executed here
//! - **Environment**: injected [`Clock`], store, post directory, notification sink
//!   and deadline ledger traits
//!
//! The crate performs no I/O. `sponsorlink-runtime` wires the reducer to the
//! environment traits; `sponsorlink-postgres` implements them.

pub mod action;
pub mod deadline;
pub mod environment;
pub mod error;
pub mod ids;
pub mod listing;
pub mod notification;
pub mod outcome;
pub mod reducer;
pub mod types;

pub use action::CollaborationAction;
pub use deadline::{DeadlineLedger, EXPIRY_THRESHOLDS, LedgerEntry};
pub use environment::{
    BoxFuture, Clock, CollaborationQuery, CollaborationStore, DeadlineLedgerStore,
    NotificationSink, PostDirectory, SystemClock,
};
pub use error::{
    CollaborationError, DependencyError, ErrorKind, LedgerError, NotificationError,
    PostLookupError, StoreError,
};
pub use ids::{CollaborationId, PostId, UserId};
pub use listing::{BoardCounts, CollaborationBoard};
pub use notification::{Notification, NotificationKind};
pub use outcome::Outcome;
pub use reducer::{CollaborationEnvironment, CollaborationReducer, Effects, Reducer};
pub use types::{
    CancelReview, CollaborationDraft, CollaborationPhase, CollaborationRequest,
    CollaborationStatus, NewCollaborationRequest, PostSummary, Review,
};

// Re-export time types used throughout the public API
pub use chrono::{DateTime, NaiveDate, Utc};
