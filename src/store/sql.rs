//! SQL generation for the Postgres adapter.
//!
//! Documents live in a `doc jsonb` column next to the system columns
//! `id uuid`, `created_at`, `updated_at`, `deleted_at`. Reads splice the
//! system columns back into the document; filters and search address
//! document fields through `->>` so every bound parameter is text.

use crate::query::{Combine, QueryError, Selection, SortKey, SqlResult};

/// System columns that sort as real columns instead of `doc->>` text.
const SYSTEM_SORT_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// Expression yielding the wire-format record.
pub const RECORD_EXPR: &str = "doc || jsonb_build_object('id', \"id\", 'created_at', \"created_at\", 'updated_at', \"updated_at\") AS record";

pub fn count_sql(table: &str, selection: &Selection) -> Result<SqlResult, QueryError> {
    validate_identifier(table)?;
    let (predicate, params) = build_predicate(selection)?;
    Ok(SqlResult {
        query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", table, predicate),
        params,
    })
}

pub fn page_sql(
    table: &str,
    selection: &Selection,
    order: &[SortKey],
    limit: u64,
    offset: u64,
) -> Result<SqlResult, QueryError> {
    validate_identifier(table)?;
    let (predicate, params) = build_predicate(selection)?;
    let order_clause = build_order_clause(order)?;
    Ok(SqlResult {
        query: format!(
            "SELECT {} FROM \"{}\" WHERE {}{} LIMIT {} OFFSET {}",
            RECORD_EXPR, table, predicate, order_clause, limit, offset
        ),
        params,
    })
}

/// WHERE clause over the live (non-deleted) rows. Equality filters are ANDed;
/// the search term joins them with the selection's combine policy.
fn build_predicate(selection: &Selection) -> Result<(String, Vec<String>), QueryError> {
    let mut params = Vec::new();

    let mut filter_parts = Vec::new();
    for (field, value) in &selection.filters {
        validate_identifier(field)?;
        params.push(value.clone());
        filter_parts.push(format!("doc->>'{}' = ${}", field, params.len()));
    }

    let search_part = match &selection.search {
        None => None,
        Some(search) => {
            validate_identifier(&search.field)?;
            params.push(format!("%{}%", escape_like(&search.term)));
            Some((format!("doc->>'{}' ILIKE ${}", search.field, params.len()), search.combine))
        }
    };

    let combined = match (filter_parts.is_empty(), search_part) {
        (true, None) => String::new(),
        (false, None) => filter_parts.join(" AND "),
        (true, Some((search, _))) => search,
        (false, Some((search, Combine::And))) => {
            format!("{} AND {}", filter_parts.join(" AND "), search)
        }
        (false, Some((search, Combine::Or))) => {
            format!("(({}) OR {})", filter_parts.join(" AND "), search)
        }
    };

    let predicate = if combined.is_empty() {
        "\"deleted_at\" IS NULL".to_string()
    } else {
        format!("\"deleted_at\" IS NULL AND {}", combined)
    };
    Ok((predicate, params))
}

fn build_order_clause(order: &[SortKey]) -> Result<String, QueryError> {
    if order.is_empty() {
        return Ok(String::new());
    }
    let parts = order
        .iter()
        .map(|key| {
            validate_identifier(&key.field)?;
            let expr = if SYSTEM_SORT_COLUMNS.contains(&key.field.as_str()) {
                format!("\"{}\"", key.field)
            } else {
                format!("doc->>'{}'", key.field)
            };
            Ok(format!("{} {}", expr, key.direction.to_sql()))
        })
        .collect::<Result<Vec<_>, QueryError>>()?;
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

/// Same identifier rules as table/column names everywhere else: leading
/// alphabetic or underscore, then alphanumerics/underscores.
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        None => false,
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        }
    };
    if valid {
        Ok(())
    } else {
        Err(QueryError::Validation(format!("invalid identifier: '{}'", name)))
    }
}

/// Escape LIKE metacharacters so the user's term matches literally
/// (substring, not pattern).
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SearchTerm, SortDirection};

    fn selection(filters: &[(&str, &str)], search: Option<(&str, &str, Combine)>) -> Selection {
        Selection {
            filters: filters.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            search: search.map(|(field, term, combine)| SearchTerm {
                field: field.into(),
                term: term.into(),
                combine,
            }),
        }
    }

    #[test]
    fn count_without_filters_only_excludes_deleted() {
        let sql = count_sql("branches", &Selection::default()).unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"branches\" WHERE \"deleted_at\" IS NULL");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn filters_and_search_are_anded_by_default() {
        let sel = selection(&[("organisation_id", "org-1")], Some(("name", "acme", Combine::And)));
        let sql = count_sql("branches", &sel).unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"branches\" WHERE \"deleted_at\" IS NULL \
             AND doc->>'organisation_id' = $1 AND doc->>'name' ILIKE $2"
        );
        assert_eq!(sql.params, vec!["org-1".to_string(), "%acme%".to_string()]);
    }

    #[test]
    fn or_policy_groups_filters_against_search() {
        let sel = selection(
            &[("organisation_id", "org-1"), ("priority", "high")],
            Some(("status", "open", Combine::Or)),
        );
        let sql = count_sql("tickets", &sel).unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"tickets\" WHERE \"deleted_at\" IS NULL \
             AND ((doc->>'organisation_id' = $1 AND doc->>'priority' = $2) OR doc->>'status' ILIKE $3)"
        );
    }

    #[test]
    fn page_sql_orders_and_slices() {
        let order = vec![
            SortKey::new("created_at", SortDirection::Desc),
            SortKey::new("id", SortDirection::Desc),
        ];
        let sql = page_sql("branches", &Selection::default(), &order, 10, 20).unwrap();
        assert_eq!(
            sql.query,
            format!(
                "SELECT {} FROM \"branches\" WHERE \"deleted_at\" IS NULL \
                 ORDER BY \"created_at\" DESC, \"id\" DESC LIMIT 10 OFFSET 20",
                RECORD_EXPR
            )
        );
    }

    #[test]
    fn document_fields_sort_through_the_doc_column() {
        let order = vec![SortKey::new("name", SortDirection::Asc)];
        let sql = page_sql("branches", &Selection::default(), &order, 5, 0).unwrap();
        assert!(sql.query.contains("ORDER BY doc->>'name' ASC"));
    }

    #[test]
    fn like_metacharacters_match_literally() {
        let sel = selection(&[], Some(("name", "50%_off", Combine::And)));
        let sql = count_sql("branches", &sel).unwrap();
        assert_eq!(sql.params, vec!["%50\\%\\_off%".to_string()]);
    }

    #[test]
    fn hostile_identifiers_are_rejected() {
        assert!(validate_identifier("branches").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1starts_with_digit").is_err());
        assert!(validate_identifier("name; DROP TABLE users").is_err());
        assert!(validate_identifier("doc->>'x'").is_err());

        let sel = selection(&[("bad field", "x")], None);
        assert!(count_sql("branches", &sel).is_err());
    }
}
