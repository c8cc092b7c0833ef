//! Delivery of notification effects.
//!
//! Notifications are fire-and-forget. A delivery failure is logged and
//! counted, never reported as the failure of the operation that emitted it.

use crate::metrics::NotificationMetrics;
use futures::future::join_all;
use sponsorlink_core::environment::NotificationSink;
use sponsorlink_core::notification::Notification;
use std::sync::Arc;

/// Tally of one dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Notifications the sink accepted
    pub delivered: usize,
    /// Notifications the sink rejected
    pub failed: usize,
}

/// Sends notification effects to a [`NotificationSink`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationDispatcher {
    /// Create a dispatcher over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Deliver every notification concurrently.
    pub async fn dispatch(&self, notifications: impl IntoIterator<Item = Notification>) -> DispatchReport {
        let results = join_all(notifications.into_iter().map(|notification| {
            let sink = Arc::clone(&self.sink);
            async move {
                let event_type = notification.event_type.as_str();
                let collaboration_id = notification.collaboration_id.clone();
                let recipient = notification.recipient_id.clone();

                match sink.send(notification).await {
                    Ok(()) => {
                        NotificationMetrics::record_dispatched(event_type);
                        tracing::debug!(%collaboration_id, %recipient, event_type, "Notification sent");
                        true
                    }
                    Err(error) => {
                        NotificationMetrics::record_failed(event_type);
                        tracing::warn!(
                            %collaboration_id,
                            %recipient,
                            event_type,
                            error = %error,
                            "Notification delivery failed"
                        );
                        false
                    }
                }
            }
        }))
        .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        DispatchReport {
            delivered,
            failed: results.len() - delivered,
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}
