use serde::Serialize;

/// Pagination metadata returned alongside every page of results.
///
/// Serialized in camelCase because the envelope is consumed by the existing
/// web frontends (`totalPages`, `hasNext`, `hasPrev`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// `page` and `limit` must already be normalized (both >= 1).
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Number of items this page must contain against a stable store:
    /// `min(limit, max(0, total - (page-1)*limit))`.
    pub fn expected_len(&self) -> u64 {
        let offset = (self.page - 1) * self.limit;
        self.limit.min(self.total.saturating_sub(offset))
    }
}

/// One page of records plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
