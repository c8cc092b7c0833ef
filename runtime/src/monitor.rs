//! Background deadline monitor.
//!
//! Scans active collaborations once at startup and then on a fixed interval
//! (daily by default), emitting expiry reminders through the notification
//! sink. The scan itself is [`DeadlineMonitor::run_once`], which tests call
//! directly with a manual clock; [`DeadlineMonitor::spawn`] only adds the
//! schedule and shutdown handling.
//!
//! The ledger is saved before notifications are dispatched, so a crash
//! between the two loses a reminder rather than repeating one.

use crate::dispatch::NotificationDispatcher;
use crate::metrics::DeadlineMetrics;
use chrono::NaiveDate;
use sponsorlink_core::deadline;
use sponsorlink_core::environment::{
    Clock, CollaborationQuery, CollaborationStore, DeadlineLedgerStore, NotificationSink,
};
use sponsorlink_core::error::CollaborationError;
use sponsorlink_core::types::CollaborationStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

/// Default time between scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shortest accepted time between scans.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Date the scan evaluated against
    pub date: NaiveDate,
    /// Active collaborations examined
    pub scanned: usize,
    /// Reminders emitted
    pub notified: usize,
    /// Reminders the sink accepted
    pub delivered: usize,
    /// Reminders the sink rejected
    pub failed: usize,
}

/// Periodic scanner for collaborations nearing their end date.
#[derive(Clone)]
pub struct DeadlineMonitor {
    store: Arc<dyn CollaborationStore>,
    ledger: Arc<dyn DeadlineLedgerStore>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    run_at_startup: bool,
}

impl DeadlineMonitor {
    /// Create a monitor polling daily and scanning at startup.
    #[must_use]
    pub fn new(
        store: Arc<dyn CollaborationStore>,
        ledger: Arc<dyn DeadlineLedgerStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            dispatcher: NotificationDispatcher::new(sink),
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_at_startup: true,
        }
    }

    /// Set the time between scans, raised to [`MIN_POLL_INTERVAL`] if shorter.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Time between scans.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Choose whether the first scan happens immediately.
    #[must_use]
    pub const fn with_startup_run(mut self, run_at_startup: bool) -> Self {
        self.run_at_startup = run_at_startup;
        self
    }

    /// Scan once against the clock's current date.
    ///
    /// # Errors
    ///
    /// Returns [`CollaborationError::Dependency`] if the ledger or the store
    /// fails. Notification failures are logged and counted in the report.
    pub async fn run_once(&self) -> Result<ScanReport, CollaborationError> {
        let started = Instant::now();
        let today = self.clock.today();

        let mut ledger = self.ledger.load().await?;
        let records = self
            .store
            .find(CollaborationQuery::new().statuses(CollaborationStatus::ACTIVE))
            .await?;

        let notifications = deadline::scan(&records, today, &mut ledger);
        self.ledger.save(&ledger).await?;

        let notified = notifications.len();
        let dispatch = self.dispatcher.dispatch(notifications).await;

        DeadlineMetrics::record_scan(notified, started.elapsed());
        tracing::info!(
            %today,
            scanned = records.len(),
            notified,
            failed = dispatch.failed,
            "Deadline scan complete"
        );

        Ok(ScanReport {
            date: today,
            scanned: records.len(),
            notified,
            delivered: dispatch.delivered,
            failed: dispatch.failed,
        })
    }

    /// Run on the configured schedule until the handle is shut down.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            run_at_startup = self.run_at_startup,
            "Starting deadline monitor"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.run_at_startup {
            // The first tick completes immediately.
            interval.tick().await;
        }

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(error) = self.run_once().await {
                        tracing::error!(error = %error, "Deadline scan failed");
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        tracing::info!("Deadline monitor stopped");
    }
}

impl std::fmt::Debug for DeadlineMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineMonitor")
            .field("poll_interval", &self.poll_interval)
            .field("run_at_startup", &self.run_at_startup)
            .finish_non_exhaustive()
    }
}

/// Handle to a spawned [`DeadlineMonitor`].
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the monitor to stop and wait for it.
    ///
    /// A scan already in progress finishes first.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError`] if the monitor task panicked.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        // Err only means the task already exited.
        let _ = self.shutdown.send(true);
        self.join.await
    }

    /// Whether the monitor task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
