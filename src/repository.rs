use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config;
use crate::entities::EntityDef;
use crate::query::{self, ListParams, Page, QueryError, SearchTerm, Selection};
use crate::store::RecordStore;

/// Fields stamped by the store; stripped from every client payload.
const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

/// Binds one entity definition to a record store and exposes the operations
/// the REST surface needs.
pub struct Repository {
    def: &'static EntityDef,
    store: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(def: &'static EntityDef, store: Arc<dyn RecordStore>) -> Self {
        Self { def, store }
    }

    /// One page of records: validated pagination window, entity-default sort
    /// with id tie-break, equality filters plus the optional search term on
    /// the entity's primary text field.
    pub async fn list(
        &self,
        params: &ListParams,
        filters: Vec<(String, String)>,
    ) -> Result<Page<Value>, QueryError> {
        let request = params.page_request(config::config().query.max_limit)?;
        let sort = params.sort_key(self.def.sort_fields, self.def.default_sort)?;
        let selection = Selection {
            filters,
            search: params.search_term().map(|term| SearchTerm {
                field: self.def.search_field.to_string(),
                term: term.to_string(),
                combine: self.def.search_combine,
            }),
        };
        query::paginate(self.store.as_ref(), self.def.table, &selection, sort, request).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Value, QueryError> {
        self.store
            .fetch_by_id(self.def.table, id)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("{} not found", self.def.permission_key)))
    }

    pub async fn create(&self, payload: Value) -> Result<Value, QueryError> {
        let doc = sanitize(payload)?;
        if doc.is_empty() {
            return Err(QueryError::Validation("record must not be empty".to_string()));
        }
        self.store.insert(self.def.table, Value::Object(doc)).await
    }

    pub async fn update(&self, id: Uuid, payload: Value) -> Result<Value, QueryError> {
        let changes = sanitize(payload)?;
        if changes.is_empty() {
            return Err(QueryError::Validation("no updatable fields in payload".to_string()));
        }
        self.store
            .update(self.def.table, id, Value::Object(changes))
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("{} not found", self.def.permission_key)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<Value, QueryError> {
        self.store
            .soft_delete(self.def.table, id)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("{} not found", self.def.permission_key)))
    }
}

fn sanitize(payload: Value) -> Result<Map<String, Value>, QueryError> {
    match payload {
        Value::Object(mut map) => {
            for field in SYSTEM_FIELDS {
                map.remove(*field);
            }
            Ok(map)
        }
        _ => Err(QueryError::Validation("payload must be a JSON object".to_string())),
    }
}
