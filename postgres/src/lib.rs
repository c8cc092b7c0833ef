//! `PostgreSQL` adapters for Sponsorlink.
//!
//! Implements the storage traits from `sponsorlink-core` on top of a shared
//! sqlx connection pool:
//!
//! - [`PostgresCollaborationStore`]: collaboration records as JSONB documents
//!   with indexed copies of the filter columns
//! - [`PostgresNotificationSink`]: appends to the `collaboration_notifications`
//!   outbox read by the notification service
//! - [`PostgresDeadlineLedger`]: last-notified expiry thresholds
//!
//! # Example
//!
//! ```ignore
//! use sponsorlink_postgres::{PoolSettings, PostgresCollaborationStore, connect, migrate};
//!
//! let pool = connect(&PoolSettings::new("postgres://localhost/sponsorlink")).await?;
//! migrate(&pool).await?;
//! let store = PostgresCollaborationStore::new(pool.clone());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;

/// Last-notified threshold persistence
pub mod ledger;

/// Notification outbox
pub mod notifications;

/// Collaboration record storage
pub mod store;

pub use ledger::PostgresDeadlineLedger;
pub use notifications::PostgresNotificationSink;
pub use store::PostgresCollaborationStore;

/// Errors raised while preparing the database.
#[derive(Error, Debug)]
pub enum PostgresError {
    /// Pool could not connect.
    #[error("Failed to connect: {0}")]
    Connect(#[source] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Connection pool parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Connection string
    pub url: String,
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
}

impl PoolSettings {
    /// Settings with a ten-connection pool and a 30 second timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`PostgresError::Connect`] if the database is unreachable.
pub async fn connect(settings: &PoolSettings) -> Result<PgPool, PostgresError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .connect(&settings.url)
        .await
        .map_err(PostgresError::Connect)?;

    tracing::info!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Create or upgrade the collaboration, outbox and ledger tables.
///
/// # Errors
///
/// Returns [`PostgresError::Migrate`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), PostgresError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
