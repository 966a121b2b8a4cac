use std::collections::HashMap;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::entities::{self, EntityDef};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthMember, ListResult};
use crate::permission::PermissionState;
use crate::query::{ListParams, QueryError, RESERVED_KEYS};
use crate::repository::Repository;
use crate::server::AppState;
use crate::services::{self, PermissionService};

/// GET /api/:entity - one page of records
pub async fn list(
    Path(entity): Path<String>,
    Query(raw): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    Extension(member): Extension<AuthMember>,
) -> ListResult<Value> {
    let def = resolve(&entity)?;
    let params = ListParams::from_query(&raw).map_err(ApiError::from)?;
    let filters = collect_filters(def, &raw)?;

    if def.organisation_scoped {
        let organisation_id = organisation_from_filters(def, &filters)?;
        authorize(&state, &member, organisation_id, &def.view_permission()).await?;
    }

    let repository = Repository::new(def, state.store.clone());
    let page = repository.list(&params, filters).await?;
    Ok(page.into())
}

/// POST /api/:entity - create one record
pub async fn create(
    Path(entity): Path<String>,
    State(state): State<AppState>,
    Extension(member): Extension<AuthMember>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let def = resolve(&entity)?;

    if def.organisation_scoped {
        let organisation_id = organisation_from_payload(def, &payload)?;
        authorize(&state, &member, organisation_id, &def.create_permission()).await?;
    }

    let repository = Repository::new(def, state.store.clone());
    let record = repository.create(payload).await?;
    Ok(ApiResponse::created(record))
}

/// GET /api/:entity/:id - fetch one record
pub async fn fetch(
    Path((entity, id)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(member): Extension<AuthMember>,
) -> ApiResult<Value> {
    let def = resolve(&entity)?;
    let id = parse_id(&id)?;

    let repository = Repository::new(def, state.store.clone());
    let record = repository.find_by_id(id).await?;
    authorize_record(&state, &member, def, &record, def.view_permission()).await?;

    Ok(ApiResponse::success(record))
}

/// PATCH /api/:entity/:id - merge changes into one record
pub async fn update(
    Path((entity, id)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(member): Extension<AuthMember>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let def = resolve(&entity)?;
    let id = parse_id(&id)?;

    let repository = Repository::new(def, state.store.clone());
    let existing = repository.find_by_id(id).await?;
    authorize_record(&state, &member, def, &existing, def.update_permission()).await?;

    let record = repository.update(id, payload).await?;
    Ok(ApiResponse::success(record))
}

/// DELETE /api/:entity/:id - soft delete, returns the record as it was
pub async fn remove(
    Path((entity, id)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(member): Extension<AuthMember>,
) -> ApiResult<Value> {
    let def = resolve(&entity)?;
    let id = parse_id(&id)?;

    let repository = Repository::new(def, state.store.clone());
    let existing = repository.find_by_id(id).await?;
    authorize_record(&state, &member, def, &existing, def.delete_permission()).await?;

    let record = repository.delete(id).await?;
    Ok(ApiResponse::success(record))
}

fn resolve(entity: &str) -> Result<&'static EntityDef, ApiError> {
    entities::lookup(entity).ok_or_else(|| ApiError::not_found(format!("Unknown entity: {}", entity)))
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::validation(format!("Invalid record id: {}", id)))
}

/// Split the raw query string into entity filters. Unknown keys are rejected
/// rather than ignored; blank values mean "no constraint" and are dropped.
fn collect_filters(
    def: &EntityDef,
    raw: &HashMap<String, String>,
) -> Result<Vec<(String, String)>, ApiError> {
    let mut filters = Vec::new();
    for (key, value) in raw {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if !def.filter_fields.contains(&key.as_str()) {
            return Err(ApiError::validation(format!(
                "Unknown query parameter '{}' for {}",
                key, def.name
            )));
        }
        if value.trim().is_empty() {
            continue;
        }
        filters.push((key.clone(), value.trim().to_string()));
    }
    // HashMap order is arbitrary; keep the predicate deterministic.
    filters.sort();
    Ok(filters)
}

fn organisation_from_filters(
    def: &EntityDef,
    filters: &[(String, String)],
) -> Result<Uuid, ApiError> {
    let value = filters
        .iter()
        .find(|(key, _)| key == "organisation_id")
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| {
            ApiError::validation(format!("{} queries require an organisation_id filter", def.name))
        })?;
    parse_organisation_id(value)
}

fn organisation_from_payload(def: &EntityDef, payload: &Value) -> Result<Uuid, ApiError> {
    let value = payload
        .get("organisation_id")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ApiError::validation(format!("{} records require an organisation_id", def.name))
        })?;
    parse_organisation_id(value)
}

fn parse_organisation_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::validation("organisation_id must be a UUID"))
}

/// Load the member's permission state for the organisation and demand one
/// permission. Owners pass every check; non-members read as 403, not 404.
async fn authorize(
    state: &AppState,
    member: &AuthMember,
    organisation_id: Uuid,
    permission: &str,
) -> Result<PermissionState, ApiError> {
    let service = PermissionService::new(state.store.clone());
    let permission_state = match service.load(organisation_id, member.user_id).await {
        Ok(loaded) => loaded,
        Err(QueryError::NotFound(_)) => {
            return Err(ApiError::forbidden("Not a member of this organisation"))
        }
        Err(other) => return Err(other.into()),
    };
    services::require(&permission_state, permission)?;
    Ok(permission_state)
}

/// Record-level authorization: organisation-scoped records carry their
/// organisation; an organisation record is its own context.
async fn authorize_record(
    state: &AppState,
    member: &AuthMember,
    def: &EntityDef,
    record: &Value,
    permission: String,
) -> Result<(), ApiError> {
    let field = if def.organisation_scoped { "organisation_id" } else { "id" };
    let organisation_id = record
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::internal_server_error("Record is missing its organisation"))?;
    authorize(state, member, organisation_id, &permission).await?;
    Ok(())
}
