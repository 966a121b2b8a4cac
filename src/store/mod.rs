use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::query::{QueryError, Selection, SortKey};

pub mod memory;
pub mod postgres;
pub mod sql;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Boundary to the backing store. Records are JSON documents carrying the
/// system fields `id`, `created_at` and `updated_at`; soft-deleted records
/// are invisible to every read.
///
/// The contract is intentionally small: equality-filtered count, an
/// equality+substring-filtered sorted range read with skip/limit, and by-id
/// CRUD. Any store offering those primitives can sit behind it; this crate
/// ships a Postgres adapter and an in-memory one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Count records matching `selection`, independent of any pagination.
    async fn count(&self, table: &str, selection: &Selection) -> Result<u64, QueryError>;

    /// Read up to `limit` matching records after skipping `offset`, ordered
    /// by `order` applied left to right.
    async fn fetch_page(
        &self,
        table: &str,
        selection: &Selection,
        order: &[SortKey],
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Value>, QueryError>;

    async fn fetch_by_id(&self, table: &str, id: Uuid) -> Result<Option<Value>, QueryError>;

    /// Insert a document, stamping `id`/`created_at`/`updated_at`. Returns
    /// the stored record.
    async fn insert(&self, table: &str, doc: Value) -> Result<Value, QueryError>;

    /// Shallow-merge `changes` into the document and bump `updated_at`.
    /// Returns `None` when the record does not exist (or is soft-deleted).
    async fn update(&self, table: &str, id: Uuid, changes: Value) -> Result<Option<Value>, QueryError>;

    /// Mark the record deleted. Returns the record as it was, or `None` when
    /// already gone.
    async fn soft_delete(&self, table: &str, id: Uuid) -> Result<Option<Value>, QueryError>;

    /// Cheap reachability probe for the health endpoint.
    async fn ping(&self) -> Result<(), QueryError>;
}
