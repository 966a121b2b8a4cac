use crate::query::{Combine, SortDirection};

/// Static description of one REST entity: where it lives, what its list
/// endpoint may filter and sort on, and which permission key gates it.
#[derive(Debug)]
pub struct EntityDef {
    /// URL path segment, e.g. `/api/branches`.
    pub name: &'static str,
    /// Backing collection name.
    pub table: &'static str,
    /// Singular permission key prefix ("branch" -> "branch:view").
    pub permission_key: &'static str,
    /// The one text field `search` matches against.
    pub search_field: &'static str,
    /// Equality-filter query keys accepted by the list endpoint.
    pub filter_fields: &'static [&'static str],
    /// Fields the list endpoint may sort on.
    pub sort_fields: &'static [&'static str],
    pub default_sort: (&'static str, SortDirection),
    /// How a search term combines with the structured filters.
    pub search_combine: Combine,
    /// Whether records belong to one organisation and every access needs an
    /// organisation context.
    pub organisation_scoped: bool,
}

impl EntityDef {
    pub fn view_permission(&self) -> String {
        format!("{}:view", self.permission_key)
    }

    pub fn create_permission(&self) -> String {
        format!("{}:create", self.permission_key)
    }

    pub fn update_permission(&self) -> String {
        format!("{}:update", self.permission_key)
    }

    pub fn delete_permission(&self) -> String {
        format!("{}:delete", self.permission_key)
    }
}

const COMMON_SORTS: &[&str] = &["created_at", "updated_at", "name", "id"];

pub static ENTITIES: &[EntityDef] = &[
    EntityDef {
        name: "organisations",
        table: "organisations",
        permission_key: "organisation",
        search_field: "name",
        filter_fields: &["industry_id"],
        sort_fields: COMMON_SORTS,
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: false,
    },
    EntityDef {
        name: "members",
        table: "members",
        permission_key: "member",
        search_field: "name",
        filter_fields: &["organisation_id", "role_id", "user_id"],
        sort_fields: COMMON_SORTS,
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
    EntityDef {
        name: "industries",
        table: "industries",
        permission_key: "industry",
        search_field: "name",
        filter_fields: &["organisation_id"],
        sort_fields: COMMON_SORTS,
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
    EntityDef {
        name: "job_types",
        table: "job_types",
        permission_key: "job_type",
        search_field: "name",
        filter_fields: &["organisation_id"],
        sort_fields: COMMON_SORTS,
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
    EntityDef {
        name: "salaries",
        table: "salaries",
        permission_key: "salary",
        search_field: "name",
        filter_fields: &["organisation_id"],
        sort_fields: COMMON_SORTS,
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
    EntityDef {
        name: "branches",
        table: "branches",
        permission_key: "branch",
        search_field: "name",
        filter_fields: &["organisation_id"],
        sort_fields: COMMON_SORTS,
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
    EntityDef {
        name: "hiring_sources",
        table: "hiring_sources",
        permission_key: "hiring_source",
        search_field: "source",
        filter_fields: &["organisation_id"],
        sort_fields: &["created_at", "updated_at", "source", "id"],
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
    EntityDef {
        name: "tickets",
        table: "tickets",
        permission_key: "ticket",
        search_field: "status",
        filter_fields: &["organisation_id", "priority", "assignee_id"],
        sort_fields: &["created_at", "updated_at", "status", "priority", "id"],
        default_sort: ("created_at", SortDirection::Desc),
        search_combine: Combine::And,
        organisation_scoped: true,
    },
];

pub fn lookup(name: &str) -> Option<&'static EntityDef> {
    ENTITIES.iter().find(|def| def.name == name)
}
