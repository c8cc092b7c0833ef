//! Notification events emitted by transitions and the deadline monitor.
//!
//! The reducer only describes notifications. Delivery is the runtime's job.

use crate::ids::{CollaborationId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Event type understood by the notification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new request arrived for the receiver
    RequestCreated,
    /// The receiver accepted the request
    Accepted,
    /// The receiver rejected the request
    Rejected,
    /// The counterpart asked for a completion review
    ReviewRequested,
    /// The collaboration completed
    Completed,
    /// The collaboration was cancelled
    Cancelled,
    /// The collaboration's end date is near
    Expiring,
}

impl NotificationKind {
    /// Wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestCreated => "request_created",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::ReviewRequested => "review_requested",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expiring => "expiring",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fire-and-forget message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// User the message is for
    pub recipient_id: UserId,
    /// Event type
    pub event_type: NotificationKind,
    /// Collaboration the event concerns
    pub collaboration_id: CollaborationId,
    /// Event-specific details (post title, reason, days remaining)
    pub payload: Value,
}

impl Notification {
    /// Build a notification.
    #[must_use]
    pub const fn new(
        recipient_id: UserId,
        event_type: NotificationKind,
        collaboration_id: CollaborationId,
        payload: Value,
    ) -> Self {
        Self {
            recipient_id,
            event_type,
            collaboration_id,
            payload,
        }
    }

    /// New request, addressed to the receiver.
    #[must_use]
    pub fn request_created(
        recipient_id: UserId,
        collaboration_id: CollaborationId,
        post_title: &str,
        requester_id: &UserId,
        message: &str,
    ) -> Self {
        Self::new(
            recipient_id,
            NotificationKind::RequestCreated,
            collaboration_id,
            json!({
                "postTitle": post_title,
                "requesterId": requester_id,
                "message": message,
            }),
        )
    }

    /// Days-remaining reminder for the responsible party.
    #[must_use]
    pub fn expiring(
        recipient_id: UserId,
        collaboration_id: CollaborationId,
        post_title: &str,
        days_remaining: i64,
    ) -> Self {
        Self::new(
            recipient_id,
            NotificationKind::Expiring,
            collaboration_id,
            json!({
                "postTitle": post_title,
                "daysRemaining": days_remaining,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[test]
    fn notification_wire_shape() {
        let note = Notification::expiring(UserId::new("u2"), CollaborationId::new("c1"), "Hackathon", 7);
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["recipientId"], "u2");
        assert_eq!(json["eventType"], "expiring");
        assert_eq!(json["collaborationId"], "c1");
        assert_eq!(json["payload"]["daysRemaining"], 7);
    }

    #[test]
    fn kind_names_match_serde() {
        for kind in [
            NotificationKind::RequestCreated,
            NotificationKind::ReviewRequested,
            NotificationKind::Cancelled,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
