//! Sponsorlink deadline worker.
//!
//! Runs the deadline monitor against `PostgreSQL`: reminders are written to
//! the notification outbox and the ledger lives beside the collaborations.

use anyhow::Context;
use sponsorlink_core::environment::SystemClock;
use sponsorlink_postgres::{
    PoolSettings, PostgresCollaborationStore, PostgresDeadlineLedger, PostgresNotificationSink,
};
use sponsorlink_runtime::metrics::MetricsServer;
use sponsorlink_runtime::{Config, DeadlineMonitor, telemetry};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    telemetry::init(&config.telemetry.log_filter);
    config.validate().context("Invalid configuration")?;

    info!(
        poll_interval_secs = config.deadline.poll_interval_secs,
        run_at_startup = config.deadline.run_at_startup,
        metrics_addr = %config.telemetry.metrics_addr,
        "Starting Sponsorlink deadline worker"
    );

    let mut metrics = MetricsServer::new(config.telemetry.metrics_socket_addr()?);
    metrics.serve().context("Failed to start metrics server")?;

    let pool = sponsorlink_postgres::connect(&PoolSettings {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout: config.database.connect_timeout(),
    })
    .await
    .context("Failed to connect to PostgreSQL")?;
    sponsorlink_postgres::migrate(&pool).await?;

    let monitor = DeadlineMonitor::new(
        Arc::new(PostgresCollaborationStore::new(pool.clone())),
        Arc::new(PostgresDeadlineLedger::new(pool.clone())),
        Arc::new(PostgresNotificationSink::new(pool.clone())),
        Arc::new(SystemClock),
    )
    .with_poll_interval(config.deadline.poll_interval())
    .with_startup_run(config.deadline.run_at_startup);

    let handle = monitor.spawn();
    shutdown_signal().await;

    handle
        .shutdown()
        .await
        .context("Deadline monitor task panicked")?;
    pool.close().await;

    info!("Deadline worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
