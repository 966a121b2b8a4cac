use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config;
use crate::query::{QueryError, Selection, SortKey};
use crate::store::{sql, RecordStore};

/// Postgres-backed record store. Every round trip is bounded by the
/// configured query timeout; hitting it surfaces as a retryable
/// `Unavailable`, never a partial mutation (reads are reads, writes are
/// single statements).
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let timeout = Duration::from_millis(config::config().database.query_timeout_ms);
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Err(_) => Err(QueryError::Unavailable(format!(
                "query exceeded {}ms",
                self.timeout.as_millis()
            ))),
            Ok(result) => result.map_err(map_sqlx_error),
        }
    }
}

fn map_sqlx_error(err: sqlx::Error) -> QueryError {
    use sqlx::Error as E;
    match err {
        E::RowNotFound => QueryError::NotFound("record not found".to_string()),
        e @ (E::PoolTimedOut | E::PoolClosed | E::Io(_) | E::Tls(_) | E::WorkerCrashed) => {
            QueryError::Unavailable(e.to_string())
        }
        e => {
            tracing::error!("store query failed: {}", e);
            QueryError::Store(e.to_string())
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn count(&self, table: &str, selection: &Selection) -> Result<u64, QueryError> {
        let sql = sql::count_sql(table, selection)?;
        let row = self
            .bounded(async {
                let mut q = sqlx::query(&sql.query);
                for param in &sql.params {
                    q = q.bind(param.as_str());
                }
                q.fetch_one(&self.pool).await
            })
            .await?;
        let count: i64 = row.try_get("count").map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_page(
        &self,
        table: &str,
        selection: &Selection,
        order: &[SortKey],
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Value>, QueryError> {
        let sql = sql::page_sql(table, selection, order, limit, offset)?;
        let rows = self
            .bounded(async {
                let mut q = sqlx::query(&sql.query);
                for param in &sql.params {
                    q = q.bind(param.as_str());
                }
                q.fetch_all(&self.pool).await
            })
            .await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("record").map_err(map_sqlx_error))
            .collect()
    }

    async fn fetch_by_id(&self, table: &str, id: Uuid) -> Result<Option<Value>, QueryError> {
        sql::validate_identifier(table)?;
        let query = format!(
            "SELECT {} FROM \"{}\" WHERE \"id\" = $1 AND \"deleted_at\" IS NULL",
            sql::RECORD_EXPR,
            table
        );
        let row = self
            .bounded(sqlx::query(&query).bind(id).fetch_optional(&self.pool))
            .await?;
        row.map(|r| r.try_get::<Value, _>("record").map_err(map_sqlx_error))
            .transpose()
    }

    async fn insert(&self, table: &str, doc: Value) -> Result<Value, QueryError> {
        sql::validate_identifier(table)?;
        if !doc.is_object() {
            return Err(QueryError::Validation("record must be a JSON object".to_string()));
        }
        let query = format!(
            "INSERT INTO \"{}\" (\"id\", \"doc\", \"created_at\", \"updated_at\") \
             VALUES ($1, $2, $3, $3) RETURNING {}",
            table,
            sql::RECORD_EXPR
        );
        let row = self
            .bounded(
                sqlx::query(&query)
                    .bind(Uuid::new_v4())
                    .bind(&doc)
                    .bind(Utc::now())
                    .fetch_one(&self.pool),
            )
            .await?;
        row.try_get::<Value, _>("record").map_err(map_sqlx_error)
    }

    async fn update(&self, table: &str, id: Uuid, changes: Value) -> Result<Option<Value>, QueryError> {
        sql::validate_identifier(table)?;
        if !changes.is_object() {
            return Err(QueryError::Validation("changes must be a JSON object".to_string()));
        }
        let query = format!(
            "UPDATE \"{}\" SET \"doc\" = \"doc\" || $2, \"updated_at\" = $3 \
             WHERE \"id\" = $1 AND \"deleted_at\" IS NULL RETURNING {}",
            table,
            sql::RECORD_EXPR
        );
        let row = self
            .bounded(
                sqlx::query(&query)
                    .bind(id)
                    .bind(&changes)
                    .bind(Utc::now())
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(|r| r.try_get::<Value, _>("record").map_err(map_sqlx_error))
            .transpose()
    }

    async fn soft_delete(&self, table: &str, id: Uuid) -> Result<Option<Value>, QueryError> {
        sql::validate_identifier(table)?;
        let query = format!(
            "UPDATE \"{}\" SET \"deleted_at\" = $2, \"updated_at\" = $2 \
             WHERE \"id\" = $1 AND \"deleted_at\" IS NULL RETURNING {}",
            table,
            sql::RECORD_EXPR
        );
        let row = self
            .bounded(sqlx::query(&query).bind(id).bind(Utc::now()).fetch_optional(&self.pool))
            .await?;
        row.map(|r| r.try_get::<Value, _>("record").map_err(map_sqlx_error))
            .transpose()
    }

    async fn ping(&self) -> Result<(), QueryError> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}
