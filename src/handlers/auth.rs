use axum::extract::{Extension, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthMember};
use crate::permission::PermissionState;
use crate::query::QueryError;
use crate::server::AppState;
use crate::services::PermissionService;

/// GET /api/auth/whoami - identity of the bearer token
pub async fn whoami(Extension(member): Extension<AuthMember>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user_id": member.user_id,
        "email": member.email,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PermissionsQuery {
    pub organisation_id: Option<Uuid>,
}

/// GET /api/auth/permissions - permission state for the active organisation.
/// Without an organisation the cleared state comes back: no grants, not an
/// owner. The UI consumes this to gate controls; the entity endpoints
/// re-enforce every decision server-side regardless.
pub async fn permissions(
    Query(query): Query<PermissionsQuery>,
    State(state): State<AppState>,
    Extension(member): Extension<AuthMember>,
) -> ApiResult<Value> {
    let permission_state = match query.organisation_id {
        None => PermissionState::cleared(),
        Some(organisation_id) => {
            let service = PermissionService::new(state.store.clone());
            match service.load(organisation_id, member.user_id).await {
                Ok(loaded) => loaded,
                Err(QueryError::NotFound(_)) => {
                    return Err(ApiError::forbidden("Not a member of this organisation"))
                }
                Err(other) => return Err(other.into()),
            }
        }
    };

    let mut body = serde_json::to_value(&permission_state)
        .map_err(|e| ApiError::internal_server_error(format!("Failed to serialize permissions: {}", e)))?;
    body["organisation_id"] = match query.organisation_id {
        Some(id) => Value::String(id.to_string()),
        None => Value::Null,
    };
    Ok(ApiResponse::success(body))
}
