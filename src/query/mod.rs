pub mod error;
pub mod page;
pub mod params;
pub mod types;

pub use error::QueryError;
pub use page::{Page, Pagination};
pub use params::{ListParams, PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE, RESERVED_KEYS};
pub use types::{field_text, Combine, SearchTerm, Selection, SortDirection, SortKey, SqlResult};

use serde_json::Value;

use crate::store::RecordStore;

/// Run one paginated query: count the records matching `selection`, then read
/// the requested slice. The two reads are not snapshot-isolated, so `total`
/// may be stale by the time the slice lands; callers accept that relaxation.
///
/// The sort always ends on the unique `id` (same direction as the primary
/// key) so pagination stays stable when primary sort values tie.
pub async fn paginate(
    store: &dyn RecordStore,
    table: &str,
    selection: &Selection,
    sort: SortKey,
    request: PageRequest,
) -> Result<Page<Value>, QueryError> {
    let total = store.count(table, selection).await?;
    let pagination = Pagination::new(total, request.page, request.limit);

    let items = if request.offset() >= total {
        Vec::new()
    } else {
        let order = with_tie_break(sort);
        store
            .fetch_page(table, selection, &order, request.limit, request.offset())
            .await?
    };

    Ok(Page { items, pagination })
}

fn with_tie_break(primary: SortKey) -> Vec<SortKey> {
    if primary.field == "id" {
        return vec![primary];
    }
    let tie_break = SortKey::new("id", primary.direction);
    vec![primary, tie_break]
}
