use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::permission::{PermissionState, Role};
use crate::query::{QueryError, Selection, SortDirection, SortKey};
use crate::store::RecordStore;

/// Loads permission state from the members collection. One fetch per active
/// organisation; the returned state is built whole, so a context switch
/// replaces it atomically instead of patching fields.
pub struct PermissionService {
    store: Arc<dyn RecordStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Permission state for `user_id` within `organisation_id`. `NotFound`
    /// means no membership; the HTTP layer turns that into a 403.
    pub async fn load(
        &self,
        organisation_id: Uuid,
        user_id: Uuid,
    ) -> Result<PermissionState, QueryError> {
        let selection = Selection {
            filters: vec![
                ("organisation_id".to_string(), organisation_id.to_string()),
                ("user_id".to_string(), user_id.to_string()),
            ],
            search: None,
        };
        let order = [SortKey::new("created_at", SortDirection::Asc)];
        let mut rows = self
            .store
            .fetch_page("members", &selection, &order, 1, 0)
            .await?;
        let member = rows
            .pop()
            .ok_or_else(|| QueryError::NotFound("member not found in organisation".to_string()))?;
        Ok(state_from_member(&member))
    }
}

fn state_from_member(record: &Value) -> PermissionState {
    let member_id = record
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok());
    let Some(member_id) = member_id else {
        tracing::warn!("member record without a usable id, denying all permissions");
        return PermissionState::cleared();
    };

    let is_owner = record.get("is_owner").and_then(Value::as_bool).unwrap_or(false);
    let role = record
        .get("role")
        .and_then(|v| serde_json::from_value::<Role>(v.clone()).ok());

    PermissionState::from_grants(
        member_id,
        is_owner,
        role,
        string_list(record.get("permissions")),
        string_list(record.get("extra_permissions")),
    )
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Translate an evaluator verdict into the HTTP boundary's 403. The
/// evaluator itself stays pure; only this adapter produces errors.
pub fn require(state: &PermissionState, permission: &str) -> Result<(), ApiError> {
    if state.can(permission) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("Missing permission: {}", permission)))
    }
}
