//! Collaboration records stored as JSONB documents.
//!
//! The `document` column is the source of truth. `status`, the party ids and
//! the timestamps are duplicated into plain columns so [`find`] can filter and
//! order in SQL and [`update`] can condition on the stored status.
//!
//! [`find`]: CollaborationStore::find
//! [`update`]: CollaborationStore::update

use sponsorlink_core::environment::{BoxFuture, CollaborationQuery, CollaborationStore};
use sponsorlink_core::error::StoreError;
use sponsorlink_core::ids::CollaborationId;
use sponsorlink_core::types::{CollaborationDraft, CollaborationRequest, CollaborationStatus};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// `PostgreSQL`-backed [`CollaborationStore`].
#[derive(Debug, Clone)]
pub struct PostgresCollaborationStore {
    pool: PgPool,
}

impl PostgresCollaborationStore {
    /// Create a store on an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn exists(&self, id: &CollaborationId) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM collaborations WHERE id = $1)")
                .bind(id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(unavailable)?;
        Ok(exists)
    }
}

impl CollaborationStore for PostgresCollaborationStore {
    fn insert(
        &self,
        draft: CollaborationDraft,
    ) -> BoxFuture<'_, Result<CollaborationRequest, StoreError>> {
        Box::pin(async move {
            let id = CollaborationId::new(Uuid::new_v4().to_string());
            let record = CollaborationRequest::from_draft(id, draft);

            sqlx::query(
                r"
                INSERT INTO collaborations (
                    id, post_id, requester_id, receiver_id, status,
                    end_date, created_at, updated_at, document
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(record.id.as_str())
            .bind(record.post_id.as_str())
            .bind(record.requester_id.as_str())
            .bind(record.receiver_id.as_str())
            .bind(record.status().as_str())
            .bind(record.end_date)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(Json(&record))
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::DuplicatePending {
                        post_id: record.post_id.clone(),
                        requester_id: record.requester_id.clone(),
                    }
                }
                other => unavailable(other),
            })?;

            tracing::debug!(collaboration_id = %record.id, "Inserted collaboration");
            Ok(record)
        })
    }

    fn get(
        &self,
        id: &CollaborationId,
    ) -> BoxFuture<'_, Result<Option<CollaborationRequest>, StoreError>> {
        let id = id.clone();
        Box::pin(async move {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT document FROM collaborations WHERE id = $1")
                    .bind(id.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(unavailable)?;

            row.map(|(document,)| decode(document)).transpose()
        })
    }

    fn update(
        &self,
        record: CollaborationRequest,
        expected: CollaborationStatus,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE collaborations
                SET status = $3, end_date = $4, updated_at = $5, document = $6
                WHERE id = $1 AND status = $2
                ",
            )
            .bind(record.id.as_str())
            .bind(expected.as_str())
            .bind(record.status().as_str())
            .bind(record.end_date)
            .bind(record.updated_at)
            .bind(Json(&record))
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

            if result.rows_affected() > 0 {
                return Ok(());
            }

            if self.exists(&record.id).await? {
                metrics::counter!("collaboration_store.conflicts").increment(1);
                tracing::warn!(
                    collaboration_id = %record.id,
                    expected = %expected,
                    "Conditional update lost to a concurrent writer"
                );
                Err(StoreError::Conflict {
                    id: record.id,
                    expected,
                })
            } else {
                Err(StoreError::NotFound(record.id))
            }
        })
    }

    fn find(
        &self,
        query: CollaborationQuery,
    ) -> BoxFuture<'_, Result<Vec<CollaborationRequest>, StoreError>> {
        Box::pin(async move {
            let mut builder = select_matching(&query);
            let rows: Vec<(serde_json::Value,)> = builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;

            rows.into_iter().map(|(document,)| decode(document)).collect()
        })
    }
}

/// Build the `SELECT` for a query, newest first with id as tie-break.
fn select_matching(query: &CollaborationQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT document FROM collaborations WHERE TRUE");

    if let Some(post_id) = &query.post_id {
        builder.push(" AND post_id = ").push_bind(post_id.as_str().to_string());
    }
    if let Some(requester_id) = &query.requester_id {
        builder
            .push(" AND requester_id = ")
            .push_bind(requester_id.as_str().to_string());
    }
    if let Some(receiver_id) = &query.receiver_id {
        builder
            .push(" AND receiver_id = ")
            .push_bind(receiver_id.as_str().to_string());
    }
    if !query.statuses.is_empty() {
        let statuses: Vec<String> = query
            .statuses
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();
        builder.push(" AND status = ANY(").push_bind(statuses).push(")");
    }

    builder.push(" ORDER BY created_at DESC, id DESC");
    builder
}

fn decode(document: serde_json::Value) -> Result<CollaborationRequest, StoreError> {
    serde_json::from_value(document).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[allow(clippy::needless_pass_by_value)]
fn unavailable(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sponsorlink_core::ids::{PostId, UserId};

    #[test]
    fn empty_query_selects_everything_newest_first() {
        let builder = select_matching(&CollaborationQuery::new());
        assert_eq!(
            builder.sql(),
            "SELECT document FROM collaborations WHERE TRUE ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn filters_become_bound_parameters() {
        let query = CollaborationQuery::new()
            .post(PostId::new("p1"))
            .requester(UserId::new("u1"))
            .status(CollaborationStatus::Pending);
        let builder = select_matching(&query);
        let sql = builder.sql();
        assert!(sql.contains("post_id = $1"));
        assert!(sql.contains("requester_id = $2"));
        assert!(sql.contains("status = ANY($3)"));
        assert!(!sql.contains("receiver_id"));
    }

    #[test]
    fn malformed_document_is_a_serialization_error() {
        let result = decode(serde_json::json!({ "id": 42 }));
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
