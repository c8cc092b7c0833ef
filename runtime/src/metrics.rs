//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for:
//! - Collaboration transitions and refusals
//! - Notification delivery
//! - Deadline monitor scans
//!
//! # Example
//!
//! ```rust,no_run
//! use sponsorlink_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serve metrics on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.serve()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use sponsorlink_core::error::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Counter of successful transitions, labelled by action.
pub const TRANSITIONS_TOTAL: &str = "collaboration_transitions_total";
/// Counter of refused or failed operations, labelled by operation and kind.
pub const ERRORS_TOTAL: &str = "collaboration_errors_total";
/// Counter of delivered notifications, labelled by event type.
pub const NOTIFICATIONS_DISPATCHED_TOTAL: &str = "notifications_dispatched_total";
/// Counter of failed notification deliveries, labelled by event type.
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "notifications_failed_total";
/// Counter of completed deadline scans.
pub const DEADLINE_SCANS_TOTAL: &str = "deadline_scans_total";
/// Counter of expiry reminders emitted.
pub const DEADLINE_NOTIFICATIONS_TOTAL: &str = "deadline_notifications_total";
/// Histogram of deadline scan durations.
pub const DEADLINE_SCAN_DURATION: &str = "deadline_scan_duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder without an HTTP listener; render with [`Self::render`].
    ///
    /// # Errors
    ///
    /// Returns error if the metrics exporter cannot be installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        // Register all metric descriptions
        register_metrics();

        match builder()?.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => already_installed(&e.to_string()),
        }
    }

    /// Install the recorder and serve `/metrics` on the configured address.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    pub fn serve(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match builder()?.with_http_listener(self.addr).install() {
            Ok(()) => {
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => already_installed(&e.to_string()),
        }
    }

    /// Address the server is configured for.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder wasn't installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        // Configure histogram buckets for scan latency
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

fn already_installed(err_msg: &str) -> Result<(), MetricsError> {
    if err_msg.contains("already initialized") {
        // In tests, multiple MetricsServer instances may be created
        tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
        Ok(())
    } else {
        Err(MetricsError::Install(err_msg.to_string()))
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        TRANSITIONS_TOTAL,
        "Total number of collaboration state changes, including creation"
    );
    describe_counter!(
        ERRORS_TOTAL,
        "Total number of collaboration operations that returned an error"
    );
    describe_counter!(
        NOTIFICATIONS_DISPATCHED_TOTAL,
        "Total number of notifications delivered to the notification service"
    );
    describe_counter!(
        NOTIFICATIONS_FAILED_TOTAL,
        "Total number of notifications the notification service failed to accept"
    );
    describe_counter!(DEADLINE_SCANS_TOTAL, "Total number of deadline monitor scans");
    describe_counter!(
        DEADLINE_NOTIFICATIONS_TOTAL,
        "Total number of expiry reminders emitted by the deadline monitor"
    );
    describe_histogram!(
        DEADLINE_SCAN_DURATION,
        "Deadline monitor scan duration in seconds"
    );
}

/// Collaboration operation metrics recorder.
pub struct CollaborationMetrics;

impl CollaborationMetrics {
    /// Record a successful transition.
    pub fn record_transition(action: &'static str) {
        counter!(TRANSITIONS_TOTAL, "action" => action).increment(1);
    }

    /// Record an operation error.
    pub fn record_error(operation: &'static str, kind: ErrorKind) {
        counter!(ERRORS_TOTAL, "operation" => operation, "kind" => kind.as_str()).increment(1);
    }
}

/// Notification delivery metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a delivered notification.
    pub fn record_dispatched(event_type: &'static str) {
        counter!(NOTIFICATIONS_DISPATCHED_TOTAL, "event_type" => event_type).increment(1);
    }

    /// Record a failed delivery.
    pub fn record_failed(event_type: &'static str) {
        counter!(NOTIFICATIONS_FAILED_TOTAL, "event_type" => event_type).increment(1);
    }
}

/// Deadline monitor metrics recorder.
pub struct DeadlineMetrics;

impl DeadlineMetrics {
    /// Record a completed scan.
    pub fn record_scan(notifications: usize, duration: Duration) {
        counter!(DEADLINE_SCANS_TOTAL).increment(1);
        counter!(DEADLINE_NOTIFICATIONS_TOTAL).increment(notifications as u64);
        histogram!(DEADLINE_SCAN_DURATION).record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);

        server.start().unwrap();

        CollaborationMetrics::record_transition("accept");
        NotificationMetrics::record_dispatched("accepted");
        DeadlineMetrics::record_scan(2, Duration::from_millis(40));

        // If this test runs after another test initialized the recorder,
        // handle might be None. That's OK - metrics are still being recorded.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains(TRANSITIONS_TOTAL));
            assert!(rendered.contains(NOTIFICATIONS_DISPATCHED_TOTAL));
            assert!(rendered.contains(DEADLINE_SCANS_TOTAL));
        }
    }
}
