//! Deadline ledger persistence.
//!
//! The monitor saves the whole ledger after each scan, so [`save`] replaces
//! the table contents inside one transaction.
//!
//! [`save`]: DeadlineLedgerStore::save

use chrono::NaiveDate;
use sponsorlink_core::deadline::{DeadlineLedger, LedgerEntry};
use sponsorlink_core::environment::{BoxFuture, DeadlineLedgerStore};
use sponsorlink_core::error::LedgerError;
use sponsorlink_core::ids::CollaborationId;
use sqlx::PgPool;

/// `PostgreSQL`-backed [`DeadlineLedgerStore`].
#[derive(Debug, Clone)]
pub struct PostgresDeadlineLedger {
    pool: PgPool,
}

impl PostgresDeadlineLedger {
    /// Create a ledger store on an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DeadlineLedgerStore for PostgresDeadlineLedger {
    fn load(&self) -> BoxFuture<'_, Result<DeadlineLedger, LedgerError>> {
        Box::pin(async move {
            let rows: Vec<(String, NaiveDate, i64)> = sqlx::query_as(
                "SELECT collaboration_id, end_date, threshold FROM deadline_ledger",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

            Ok(rows
                .into_iter()
                .map(|(id, end_date, threshold)| {
                    (
                        CollaborationId::new(id),
                        LedgerEntry {
                            end_date,
                            threshold,
                        },
                    )
                })
                .collect())
        })
    }

    fn save(&self, ledger: &DeadlineLedger) -> BoxFuture<'_, Result<(), LedgerError>> {
        let mut ids = Vec::with_capacity(ledger.len());
        let mut end_dates = Vec::with_capacity(ledger.len());
        let mut thresholds = Vec::with_capacity(ledger.len());
        for (id, entry) in ledger.iter() {
            ids.push(id.as_str().to_string());
            end_dates.push(entry.end_date);
            thresholds.push(entry.threshold);
        }

        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(storage)?;

            sqlx::query("DELETE FROM deadline_ledger")
                .execute(&mut *tx)
                .await
                .map_err(storage)?;

            if !ids.is_empty() {
                sqlx::query(
                    r"
                    INSERT INTO deadline_ledger (collaboration_id, end_date, threshold)
                    SELECT * FROM UNNEST($1::text[], $2::date[], $3::bigint[])
                    ",
                )
                .bind(&ids)
                .bind(&end_dates)
                .bind(&thresholds)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
            }

            tx.commit().await.map_err(storage)?;
            tracing::debug!(entries = ids.len(), "Saved deadline ledger");
            Ok(())
        })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn storage(error: sqlx::Error) -> LedgerError {
    LedgerError::Storage(error.to_string())
}
