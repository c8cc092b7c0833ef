//! Received/sent views partitioned for display.

use crate::ids::{CollaborationId, UserId};
use crate::types::{CollaborationRequest, CollaborationStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

/// A user's collaborations grouped by what they are waiting on.
///
/// Rejected requests are not shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationBoard {
    /// Pending requests the user received and must answer
    pub awaiting_reply: Vec<CollaborationRequest>,
    /// Accepted collaborations
    pub active: Vec<CollaborationRequest>,
    /// Collaborations pending a completion review
    pub awaiting_review: Vec<CollaborationRequest>,
    /// Completed collaborations
    pub completed: Vec<CollaborationRequest>,
    /// Cancelled collaborations
    pub cancelled: Vec<CollaborationRequest>,
}

/// Number of records in each board partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCounts {
    /// Size of `awaiting_reply`
    pub awaiting_reply: usize,
    /// Size of `active`
    pub active: usize,
    /// Size of `awaiting_review`
    pub awaiting_review: usize,
    /// Size of `completed`
    pub completed: usize,
    /// Size of `cancelled`
    pub cancelled: usize,
}

impl CollaborationBoard {
    /// Merge the received and sent views for `user`, de-duplicate by id, and
    /// partition by status. Every partition is ordered newest first with `id`
    /// descending as the tie-break.
    #[must_use]
    pub fn build(
        user: &UserId,
        received: impl IntoIterator<Item = CollaborationRequest>,
        sent: impl IntoIterator<Item = CollaborationRequest>,
    ) -> Self {
        let mut seen: HashSet<CollaborationId> = HashSet::new();
        let mut board = Self::default();

        for record in received.into_iter().chain(sent) {
            if !seen.insert(record.id.clone()) {
                continue;
            }
            match record.status() {
                CollaborationStatus::Pending if &record.receiver_id == user => {
                    board.awaiting_reply.push(record);
                }
                CollaborationStatus::Pending | CollaborationStatus::Rejected => {}
                CollaborationStatus::Accepted => board.active.push(record),
                CollaborationStatus::PendingReview => board.awaiting_review.push(record),
                CollaborationStatus::Complete => board.completed.push(record),
                CollaborationStatus::Cancel => board.cancelled.push(record),
            }
        }

        for partition in [
            &mut board.awaiting_reply,
            &mut board.active,
            &mut board.awaiting_review,
            &mut board.completed,
            &mut board.cancelled,
        ] {
            sort_newest_first(partition);
        }
        board
    }

    /// Per-partition sizes for badge display.
    #[must_use]
    pub fn counts(&self) -> BoardCounts {
        BoardCounts {
            awaiting_reply: self.awaiting_reply.len(),
            active: self.active.len(),
            awaiting_review: self.awaiting_review.len(),
            completed: self.completed.len(),
            cancelled: self.cancelled.len(),
        }
    }

    /// Whether every partition is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts() == BoardCounts::default()
    }
}

/// Order by `createdAt` descending, then `id` descending.
pub fn sort_newest_first(records: &mut [CollaborationRequest]) {
    records.sort_by_key(|record| Reverse((record.created_at, record.id.clone())));
}
