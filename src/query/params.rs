use std::collections::HashMap;

use super::error::QueryError;
use super::types::{SortDirection, SortKey};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Query-string keys consumed by pagination itself; everything else on a list
/// request is treated as an entity filter.
pub const RESERVED_KEYS: &[&str] = &["page", "limit", "search", "sort", "order"];

/// Raw list parameters as they arrive on the query string.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Normalized pagination window, guaranteed `page >= 1` and `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl ListParams {
    /// Pull the reserved keys out of a raw query map. Non-numeric `page` or
    /// `limit` values are a validation error, never coerced.
    pub fn from_query(raw: &HashMap<String, String>) -> Result<Self, QueryError> {
        Ok(Self {
            page: parse_int(raw, "page")?,
            limit: parse_int(raw, "limit")?,
            search: raw.get("search").cloned(),
            sort: raw.get("sort").cloned(),
            order: raw.get("order").cloned(),
        })
    }

    /// Normalization policy: absent values take the defaults; present values
    /// below 1 are rejected (`limit=0` is never "unlimited"); values above
    /// `max_limit` are capped to it.
    pub fn page_request(&self, max_limit: u64) -> Result<PageRequest, QueryError> {
        let page = match self.page {
            None => DEFAULT_PAGE,
            Some(p) if p >= 1 => p as u64,
            Some(p) => return Err(QueryError::Validation(format!("page must be >= 1, got {}", p))),
        };
        let limit = match self.limit {
            None => DEFAULT_LIMIT,
            Some(l) if l >= 1 => (l as u64).min(max_limit),
            Some(l) => return Err(QueryError::Validation(format!("limit must be >= 1, got {}", l))),
        };
        Ok(PageRequest { page, limit })
    }

    /// Trimmed search term; empty or absent means "no text filter".
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Resolve `sort`/`order` against the entity's allowed sort fields,
    /// falling back to the entity default. Unknown fields and directions are
    /// rejected rather than silently ignored.
    pub fn sort_key(
        &self,
        allowed: &[&str],
        default: (&str, SortDirection),
    ) -> Result<SortKey, QueryError> {
        let field = match self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => default.0.to_string(),
            Some(field) => {
                if !allowed.contains(&field) {
                    return Err(QueryError::Validation(format!("cannot sort by '{}'", field)));
                }
                field.to_string()
            }
        };
        let direction = match self.order.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => {
                if field == default.0 {
                    default.1
                } else {
                    SortDirection::Asc
                }
            }
            Some(order) => SortDirection::parse(order)
                .ok_or_else(|| QueryError::Validation(format!("order must be 'asc' or 'desc', got '{}'", order)))?,
        };
        Ok(SortKey { field, direction })
    }
}

fn parse_int(raw: &HashMap<String, String>, key: &str) -> Result<Option<i64>, QueryError> {
    match raw.get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| QueryError::Validation(format!("{} must be an integer, got '{}'", key, value))),
    }
}
