//! Transactional outbox for notifications.
//!
//! Delivery here means the row is committed. The notification service reads
//! `collaboration_notifications` and owns everything after that.

use sponsorlink_core::environment::{BoxFuture, NotificationSink};
use sponsorlink_core::error::NotificationError;
use sponsorlink_core::ids::UserId;
use sponsorlink_core::notification::Notification;
use sqlx::PgPool;
use sqlx::types::Json;

/// Writes notifications to the `collaboration_notifications` table.
#[derive(Debug, Clone)]
pub struct PostgresNotificationSink {
    pool: PgPool,
}

impl PostgresNotificationSink {
    /// Create a sink on an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Number of outbox rows addressed to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Delivery`] if the query fails.
    pub async fn count_for(&self, recipient: &UserId) -> Result<i64, NotificationError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM collaboration_notifications WHERE recipient_id = $1")
                .bind(recipient.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        Ok(count)
    }
}

impl NotificationSink for PostgresNotificationSink {
    fn send(&self, notification: Notification) -> BoxFuture<'_, Result<(), NotificationError>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO collaboration_notifications (
                    recipient_id, event_type, collaboration_id, payload
                ) VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(notification.recipient_id.as_str())
            .bind(notification.event_type.as_str())
            .bind(notification.collaboration_id.as_str())
            .bind(Json(&notification.payload))
            .execute(&self.pool)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

            metrics::counter!(
                "collaboration_outbox.written",
                "event_type" => notification.event_type.as_str()
            )
            .increment(1);
            Ok(())
        })
    }
}
