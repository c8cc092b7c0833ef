//! Actions that drive a collaboration through its lifecycle.

use crate::ids::UserId;
use crate::types::{CollaborationStatus, Review};
use serde::{Deserialize, Serialize};

/// A transition requested by one of the two parties.
///
/// Creation is not an action: a record comes into existence already
/// `Pending`, so the reducer only handles changes to existing records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CollaborationAction {
    /// Receiver accepts a pending request
    Accept {
        /// Caller identity
        actor: UserId,
    },

    /// Receiver declines a pending request
    Reject {
        /// Caller identity
        actor: UserId,
        /// Why the request is declined
        reason: String,
    },

    /// Either party marks an accepted collaboration finished
    InitiateCompletion {
        /// Caller identity
        actor: UserId,
        /// Optional review of the counterpart
        #[serde(default, skip_serializing_if = "Option::is_none")]
        review: Option<Review>,
    },

    /// Either party cancels an accepted collaboration
    Cancel {
        /// Caller identity
        actor: UserId,
        /// Why the collaboration is cancelled
        reason: String,
        /// Rating of the counterpart (1-5)
        rating: u8,
    },

    /// The awaited party reviews a collaboration pending review
    SubmitReview {
        /// Caller identity
        actor: UserId,
        /// Review of the counterpart
        review: Review,
    },
}

impl CollaborationAction {
    /// Short verb used in errors, logs, and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept",
            Self::Reject { .. } => "reject",
            Self::InitiateCompletion { .. } => "initiate_completion",
            Self::Cancel { .. } => "cancel",
            Self::SubmitReview { .. } => "submit_review",
        }
    }

    /// Caller identity carried by the action.
    #[must_use]
    pub const fn actor(&self) -> &UserId {
        match self {
            Self::Accept { actor }
            | Self::Reject { actor, .. }
            | Self::InitiateCompletion { actor, .. }
            | Self::Cancel { actor, .. }
            | Self::SubmitReview { actor, .. } => actor,
        }
    }

    /// The only status this action may be applied to.
    #[must_use]
    pub const fn source_status(&self) -> CollaborationStatus {
        match self {
            Self::Accept { .. } | Self::Reject { .. } => CollaborationStatus::Pending,
            Self::InitiateCompletion { .. } | Self::Cancel { .. } => CollaborationStatus::Accepted,
            Self::SubmitReview { .. } => CollaborationStatus::PendingReview,
        }
    }
}
