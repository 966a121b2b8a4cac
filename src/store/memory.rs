use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::query::{field_text, QueryError, Selection, SortDirection, SortKey};
use crate::store::RecordStore;

/// In-memory record store. Backs the test suite and local runs without a
/// database; semantics mirror the Postgres adapter (text-form equality,
/// case-insensitive substring search, nulls-last ascending sort).
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<MemRecord>>>,
}

#[derive(Debug, Clone)]
struct MemRecord {
    id: Uuid,
    doc: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl MemRecord {
    fn materialize(&self) -> Value {
        let mut map = self.doc.clone();
        map.insert("id".to_string(), Value::String(self.id.to_string()));
        map.insert("created_at".to_string(), Value::String(self.created_at.to_rfc3339()));
        map.insert("updated_at".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(map)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit creation time. Lets tests and fixtures pin
    /// sort order (including deliberate `created_at` ties).
    pub async fn seed(
        &self,
        table: &str,
        doc: Value,
        created_at: DateTime<Utc>,
    ) -> Result<Value, QueryError> {
        let doc = as_object(doc)?;
        let record = MemRecord {
            id: Uuid::new_v4(),
            doc,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        };
        let materialized = record.materialize();
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record);
        Ok(materialized)
    }
}

fn as_object(doc: Value) -> Result<Map<String, Value>, QueryError> {
    match doc {
        Value::Object(map) => Ok(map),
        _ => Err(QueryError::Validation("record must be a JSON object".to_string())),
    }
}

fn compare(a: &Value, b: &Value, order: &[SortKey]) -> Ordering {
    for key in order {
        let left = field_text(a, &key.field);
        let right = field_text(b, &key.field);
        let ord = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        };
        let ord = if key.direction == SortDirection::Desc { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count(&self, table: &str, selection: &Selection) -> Result<u64, QueryError> {
        let tables = self.tables.read().await;
        let count = tables
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.deleted_at.is_none())
                    .filter(|r| selection.matches(&r.materialize()))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn fetch_page(
        &self,
        table: &str,
        selection: &Selection,
        order: &[SortKey],
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Value>, QueryError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Value> = tables
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.deleted_at.is_none())
                    .map(MemRecord::materialize)
                    .filter(|v| selection.matches(v))
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by(|a, b| compare(a, b, order));
        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn fetch_by_id(&self, table: &str, id: Uuid) -> Result<Option<Value>, QueryError> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|records| {
            records
                .iter()
                .find(|r| r.id == id && r.deleted_at.is_none())
                .map(MemRecord::materialize)
        }))
    }

    async fn insert(&self, table: &str, doc: Value) -> Result<Value, QueryError> {
        self.seed(table, doc, Utc::now()).await
    }

    async fn update(&self, table: &str, id: Uuid, changes: Value) -> Result<Option<Value>, QueryError> {
        let changes = as_object(changes)?;
        let mut tables = self.tables.write().await;
        let record = tables
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == id && r.deleted_at.is_none()));
        Ok(record.map(|r| {
            for (key, value) in changes {
                r.doc.insert(key, value);
            }
            r.updated_at = Utc::now();
            r.materialize()
        }))
    }

    async fn soft_delete(&self, table: &str, id: Uuid) -> Result<Option<Value>, QueryError> {
        let mut tables = self.tables.write().await;
        let record = tables
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == id && r.deleted_at.is_none()));
        Ok(record.map(|r| {
            let materialized = r.materialize();
            r.deleted_at = Some(Utc::now());
            materialized
        }))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Combine, SearchTerm};
    use chrono::TimeZone;
    use serde_json::json;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .seed("branches", json!({"organisation_id": "org-1", "name": "Acme Corp"}), at(0))
            .await
            .unwrap();
        store
            .seed("branches", json!({"organisation_id": "org-1", "name": "Beta Works"}), at(1))
            .await
            .unwrap();
        store
            .seed("branches", json!({"organisation_id": "org-2", "name": "Acme North"}), at(2))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn count_honours_filters_and_search() {
        let store = seeded().await;
        let all = Selection::default();
        assert_eq!(store.count("branches", &all).await.unwrap(), 3);

        let org_one = Selection {
            filters: vec![("organisation_id".into(), "org-1".into())],
            search: None,
        };
        assert_eq!(store.count("branches", &org_one).await.unwrap(), 2);

        let acme_in_org_one = Selection {
            filters: vec![("organisation_id".into(), "org-1".into())],
            search: Some(SearchTerm { field: "name".into(), term: "ACME".into(), combine: Combine::And }),
        };
        assert_eq!(store.count("branches", &acme_in_org_one).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fetch_page_sorts_and_slices() {
        let store = seeded().await;
        let order = vec![SortKey::new("created_at", SortDirection::Desc)];
        let page = store
            .fetch_page("branches", &Selection::default(), &order, 2, 0)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["name"], "Acme North");
        assert_eq!(page[1]["name"], "Beta Works");

        let rest = store
            .fetch_page("branches", &Selection::default(), &order, 2, 2)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0]["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn tied_sort_keys_fall_back_to_id() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c", "d"] {
            store.seed("branches", json!({"name": name}), at(5)).await.unwrap();
        }
        let order = vec![
            SortKey::new("created_at", SortDirection::Desc),
            SortKey::new("id", SortDirection::Desc),
        ];
        let first = store.fetch_page("branches", &Selection::default(), &order, 2, 0).await.unwrap();
        let second = store.fetch_page("branches", &Selection::default(), &order, 2, 2).await.unwrap();
        let mut ids: Vec<String> = first
            .iter()
            .chain(second.iter())
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 4);
        ids.dedup();
        assert_eq!(ids.len(), 4, "pages must not overlap when created_at ties");
    }

    #[tokio::test]
    async fn soft_deleted_records_disappear_from_reads() {
        let store = seeded().await;
        let order = vec![SortKey::new("created_at", SortDirection::Desc)];
        let page = store.fetch_page("branches", &Selection::default(), &order, 10, 0).await.unwrap();
        let id = Uuid::parse_str(page[0]["id"].as_str().unwrap()).unwrap();

        let deleted = store.soft_delete("branches", id).await.unwrap();
        assert!(deleted.is_some());
        assert_eq!(store.count("branches", &Selection::default()).await.unwrap(), 2);
        assert!(store.fetch_by_id("branches", id).await.unwrap().is_none());
        assert!(store.soft_delete("branches", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_shallowly() {
        let store = seeded().await;
        let order = vec![SortKey::new("name", SortDirection::Asc)];
        let page = store.fetch_page("branches", &Selection::default(), &order, 1, 0).await.unwrap();
        let id = Uuid::parse_str(page[0]["id"].as_str().unwrap()).unwrap();

        let updated = store
            .update("branches", id, json!({"name": "Acme HQ", "city": "Vienna"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], "Acme HQ");
        assert_eq!(updated["city"], "Vienna");
        assert_eq!(updated["organisation_id"], "org-1");
    }

    #[tokio::test]
    async fn unknown_table_reads_as_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.count("nowhere", &Selection::default()).await.unwrap(), 0);
        let page = store.fetch_page("nowhere", &Selection::default(), &[], 10, 0).await.unwrap();
        assert!(page.is_empty());
    }
}
