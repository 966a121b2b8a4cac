use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

/// How a non-empty search term combines with the structured equality filters.
/// AND is the default across the registry; OR exists as a per-entity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    And,
    Or,
}

/// Case-insensitive substring match against one designated text field.
#[derive(Debug, Clone)]
pub struct SearchTerm {
    pub field: String,
    pub term: String,
    pub combine: Combine,
}

/// Predicate over one collection: equality filters (always ANDed together)
/// plus an optional search term. An empty selection matches every record.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub filters: Vec<(String, String)>,
    pub search: Option<SearchTerm>,
}

impl Selection {
    /// Evaluate the predicate against one record. Equality compares the text
    /// form of the field (matching what the SQL adapter's `->>` does); search
    /// is a case-insensitive substring test.
    pub fn matches(&self, record: &Value) -> bool {
        let filters_ok = self
            .filters
            .iter()
            .all(|(field, value)| field_text(record, field).as_deref() == Some(value.as_str()));

        match &self.search {
            None => filters_ok,
            Some(search) => {
                let search_ok = field_text(record, &search.field)
                    .map(|text| text.to_lowercase().contains(&search.term.to_lowercase()))
                    .unwrap_or(false);
                match search.combine {
                    Combine::And => filters_ok && search_ok,
                    Combine::Or => filters_ok || search_ok,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<String>,
}

/// Text form of a record field, mirroring Postgres `doc->>'field'`: strings
/// come back verbatim, scalars via their JSON rendering, objects/arrays none.
pub fn field_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
