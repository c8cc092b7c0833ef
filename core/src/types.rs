//! Domain types for collaboration requests.
//!
//! A [`CollaborationRequest`] is the negotiation record between a demand
//! post's author (the receiver) and an interested counterpart (the requester).
//! The per-status payload lives in [`CollaborationPhase`], a tagged enum that
//! only carries the fields valid for that state: a `Pending` record cannot hold
//! a review, and a `Complete` record always does.

use crate::error::CollaborationError;
use crate::ids::{CollaborationId, PostId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Valid range for every rating score.
pub const RATING_RANGE: RangeInclusive<u8> = 1..=5;

/// Flat status of a collaboration request, as stored and queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    /// Awaiting the receiver's reply
    Pending,
    /// Accepted by the receiver; the collaboration is active
    Accepted,
    /// Declined by the receiver (terminal)
    Rejected,
    /// One party marked the collaboration finished; awaiting the other's review
    PendingReview,
    /// Both parties are done (terminal)
    Complete,
    /// Cancelled by either party after acceptance (terminal)
    Cancel,
}

impl CollaborationStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Accepted,
        Self::Rejected,
        Self::PendingReview,
        Self::Complete,
        Self::Cancel,
    ];

    /// Statuses the deadline monitor treats as an active collaboration.
    pub const ACTIVE: [Self; 2] = [Self::Accepted, Self::PendingReview];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::PendingReview => "pending_review",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Complete | Self::Cancel)
    }
}

impl fmt::Display for CollaborationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown collaboration status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for CollaborationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Structured review submitted when a collaboration completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Professional skill score (1-5)
    pub professional_skill: u8,
    /// Communication score (1-5)
    pub communication: u8,
    /// Attitude score (1-5)
    pub attitude: u8,
    /// Overall satisfaction score (1-5)
    pub satisfaction: u8,
    /// Free-text comment
    pub comment: String,
    /// Hide the reviewer's identity when displayed
    pub is_anonymous: bool,
    /// When the reviewer wrote the review
    pub timestamp: DateTime<Utc>,
}

impl Review {
    /// Check every score is within [`RATING_RANGE`] and the comment is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`CollaborationError::Validation`] naming the first malformed field.
    pub fn validate(&self) -> Result<(), CollaborationError> {
        validate_score("professionalSkill", self.professional_skill)?;
        validate_score("communication", self.communication)?;
        validate_score("attitude", self.attitude)?;
        validate_score("satisfaction", self.satisfaction)?;
        if self.comment.trim().is_empty() {
            return Err(CollaborationError::Validation(
                "review comment is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Review stored when a collaboration is cancelled.
///
/// `comment` holds the cancellation reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReview {
    /// Rating of the counterpart (1-5)
    pub rating: u8,
    /// Cancellation reason
    pub comment: String,
    /// Who cancelled
    pub reviewer_id: UserId,
    /// When the cancellation was recorded
    pub reviewed_at: DateTime<Utc>,
}

/// Check a single score is within [`RATING_RANGE`].
///
/// # Errors
///
/// Returns [`CollaborationError::Validation`] when the score is out of range.
pub fn validate_score(field: &str, score: u8) -> Result<(), CollaborationError> {
    if RATING_RANGE.contains(&score) {
        Ok(())
    } else {
        Err(CollaborationError::Validation(format!(
            "{field} must be between {} and {}, got {score}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )))
    }
}

/// Status-specific payload of a collaboration request.
///
/// Serialized with an internal `status` tag so a stored document reads as
/// `{"status": "pending_review", "initiatedBy": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CollaborationPhase {
    /// Awaiting the receiver's reply
    Pending,

    /// Accepted by the receiver
    Accepted {
        /// When the receiver accepted
        accepted_at: DateTime<Utc>,
    },

    /// Declined by the receiver
    Rejected {
        /// Why the receiver declined
        reject_reason: String,
        /// When the receiver declined
        rejected_at: DateTime<Utc>,
    },

    /// One party marked the collaboration finished
    PendingReview {
        /// Party that initiated completion
        initiated_by: UserId,
        /// Party whose review is awaited
        awaiting: UserId,
        /// Review the initiator attached, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initiator_review: Option<Review>,
        /// When completion was initiated
        requested_at: DateTime<Utc>,
    },

    /// Both parties are done
    Complete {
        /// Party that initiated completion
        initiated_by: UserId,
        /// Review the initiator attached, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initiator_review: Option<Review>,
        /// Counterpart's review, stored verbatim
        review: Review,
        /// Party that submitted `review`
        reviewer: UserId,
        /// When the review was submitted
        completed_at: DateTime<Utc>,
    },

    /// Cancelled after acceptance
    Cancel {
        /// Reason and rating left by the cancelling party
        cancel_review: CancelReview,
    },
}

impl CollaborationPhase {
    /// Flat status for this phase.
    #[must_use]
    pub const fn status(&self) -> CollaborationStatus {
        match self {
            Self::Pending => CollaborationStatus::Pending,
            Self::Accepted { .. } => CollaborationStatus::Accepted,
            Self::Rejected { .. } => CollaborationStatus::Rejected,
            Self::PendingReview { .. } => CollaborationStatus::PendingReview,
            Self::Complete { .. } => CollaborationStatus::Complete,
            Self::Cancel { .. } => CollaborationStatus::Cancel,
        }
    }
}

/// A collaboration request as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationRequest {
    /// Store-assigned identifier
    pub id: CollaborationId,
    /// Demand post under negotiation
    pub post_id: PostId,
    /// Post title at creation time
    pub post_title: String,
    /// Party that sent the request
    pub requester_id: UserId,
    /// Post author, who replies to the request
    pub receiver_id: UserId,
    /// Note attached at creation
    #[serde(default)]
    pub message: String,
    /// End date of the post's event, used by the deadline monitor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Status and status-specific fields
    #[serde(flatten)]
    pub phase: CollaborationPhase,
    /// When the request was created
    pub created_at: DateTime<Utc>,
    /// When the request last changed status
    pub updated_at: DateTime<Utc>,
}

impl CollaborationRequest {
    /// Build a freshly persisted `Pending` record from a draft.
    #[must_use]
    pub fn from_draft(id: CollaborationId, draft: CollaborationDraft) -> Self {
        Self {
            id,
            post_id: draft.post_id,
            post_title: draft.post_title,
            requester_id: draft.requester_id,
            receiver_id: draft.receiver_id,
            message: draft.message,
            end_date: draft.end_date,
            phase: CollaborationPhase::Pending,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> CollaborationStatus {
        self.phase.status()
    }

    /// Whether the record can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Whether `user` is the requester or the receiver.
    #[must_use]
    pub fn is_party(&self, user: &UserId) -> bool {
        &self.requester_id == user || &self.receiver_id == user
    }

    /// The other party, if `user` is one of the two.
    #[must_use]
    pub fn counterpart_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.requester_id == user {
            Some(&self.receiver_id)
        } else if &self.receiver_id == user {
            Some(&self.requester_id)
        } else {
            None
        }
    }

    /// Reason given when the request was rejected.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&str> {
        match &self.phase {
            CollaborationPhase::Rejected { reject_reason, .. } => Some(reject_reason),
            _ => None,
        }
    }

    /// Counterpart review stored on completion.
    #[must_use]
    pub const fn review(&self) -> Option<&Review> {
        match &self.phase {
            CollaborationPhase::Complete { review, .. } => Some(review),
            _ => None,
        }
    }

    /// Cancellation review stored on cancel.
    #[must_use]
    pub const fn cancel_review(&self) -> Option<&CancelReview> {
        match &self.phase {
            CollaborationPhase::Cancel { cancel_review } => Some(cancel_review),
            _ => None,
        }
    }

    /// Party whose review is awaited while in `pending_review`.
    #[must_use]
    pub const fn awaiting_review_from(&self) -> Option<&UserId> {
        match &self.phase {
            CollaborationPhase::PendingReview { awaiting, .. } => Some(awaiting),
            _ => None,
        }
    }

    /// Move to `phase`, stamping `updated_at` without letting it go backwards.
    pub fn transition_to(&mut self, phase: CollaborationPhase, now: DateTime<Utc>) {
        self.phase = phase;
        self.updated_at = now.max(self.updated_at);
    }
}

/// A validated request that has not been persisted yet.
///
/// The store turns a draft into a [`CollaborationRequest`] by assigning an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaborationDraft {
    /// Demand post under negotiation
    pub post_id: PostId,
    /// Post title at creation time
    pub post_title: String,
    /// Party sending the request
    pub requester_id: UserId,
    /// Post author
    pub receiver_id: UserId,
    /// Note attached at creation
    pub message: String,
    /// End date of the post's event
    pub end_date: Option<NaiveDate>,
    /// Server timestamp for creation
    pub created_at: DateTime<Utc>,
}

/// Input to the create-request operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollaborationRequest {
    /// Demand post the requester is interested in
    pub post_id: PostId,
    /// Post title as shown to the requester (filled from the post when empty)
    #[serde(default)]
    pub post_title: String,
    /// Party sending the request
    pub requester_id: UserId,
    /// Post author (filled from the post when empty)
    #[serde(default = "empty_user")]
    pub receiver_id: UserId,
    /// Note attached to the request
    #[serde(default)]
    pub message: String,
}

fn empty_user() -> UserId {
    UserId::new("")
}

/// What the post service tells us about a demand post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    /// Post identifier
    pub post_id: PostId,
    /// Post author
    pub author_id: UserId,
    /// Post title
    pub title: String,
    /// End date of the event the post advertises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    fn review(score: u8, comment: &str) -> Review {
        Review {
            professional_skill: score,
            communication: score,
            attitude: score,
            satisfaction: score,
            comment: comment.to_string(),
            is_anonymous: false,
            timestamp: at(1),
        }
    }

    fn pending_record() -> CollaborationRequest {
        CollaborationRequest::from_draft(
            CollaborationId::new("c1"),
            CollaborationDraft {
                post_id: PostId::new("p1"),
                post_title: "Robotics club sponsorship".to_string(),
                requester_id: UserId::new("u1"),
                receiver_id: UserId::new("u2"),
                message: "interested".to_string(),
                end_date: NaiveDate::from_ymd_opt(2025, 6, 30),
                created_at: at(1),
            },
        )
    }

    #[test]
    fn status_wire_names_round_trip() {
        for status in CollaborationStatus::ALL {
            assert_eq!(status.as_str().parse::<CollaborationStatus>(), Ok(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("archived".parse::<CollaborationStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = CollaborationStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                CollaborationStatus::Rejected,
                CollaborationStatus::Complete,
                CollaborationStatus::Cancel
            ]
        );
    }

    #[test]
    fn review_validation_rejects_out_of_range_scores() {
        assert!(review(5, "great").validate().is_ok());
        assert!(review(0, "great").validate().is_err());
        assert!(review(6, "great").validate().is_err());

        let mut lopsided = review(4, "fine");
        lopsided.attitude = 9;
        let err = lopsided.validate().unwrap_err();
        assert!(err.to_string().contains("attitude"));
    }

    #[test]
    fn review_validation_requires_comment() {
        let err = review(3, "   ").validate().unwrap_err();
        assert!(err.to_string().contains("comment"));
    }

    #[test]
    fn pending_document_has_no_review_fields() {
        let json = serde_json::to_value(pending_record()).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["postId"], "p1");
        assert_eq!(json["requesterId"], "u1");
        assert!(json.get("review").is_none());
        assert!(json.get("rejectReason").is_none());
    }

    #[test]
    fn phase_fields_are_flattened_and_camel_cased() {
        let mut record = pending_record();
        record.transition_to(
            CollaborationPhase::PendingReview {
                initiated_by: UserId::new("u2"),
                awaiting: UserId::new("u1"),
                initiator_review: None,
                requested_at: at(2),
            },
            at(2),
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "pending_review");
        assert_eq!(json["initiatedBy"], "u2");
        assert_eq!(json["awaiting"], "u1");

        let back: CollaborationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn transition_never_moves_updated_at_backwards() {
        let mut record = pending_record();
        record.updated_at = at(10);
        record.transition_to(CollaborationPhase::Accepted { accepted_at: at(5) }, at(5));
        assert_eq!(record.updated_at, at(10));
        assert_eq!(record.status(), CollaborationStatus::Accepted);
    }

    #[test]
    fn counterpart_lookup() {
        let record = pending_record();
        assert_eq!(record.counterpart_of(&UserId::new("u1")), Some(&UserId::new("u2")));
        assert_eq!(record.counterpart_of(&UserId::new("u2")), Some(&UserId::new("u1")));
        assert_eq!(record.counterpart_of(&UserId::new("u3")), None);
        assert!(!record.is_party(&UserId::new("u3")));
    }

    #[test]
    fn new_request_defaults_receiver_when_missing() {
        let input: NewCollaborationRequest = serde_json::from_str(
            r#"{"postId":"p1","requesterId":"u1","message":"hi"}"#,
        )
        .unwrap();
        assert!(input.receiver_id.is_empty());
        assert!(input.post_title.is_empty());
    }
}
