use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role descriptor attached to a member. Informational only: the boolean
/// permission decisions below never look at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Permission set for one member within one active organisation.
///
/// The state is built whole by [`PermissionState::from_grants`] and replaced
/// whole on organisation switch; there is no field-by-field patching, so a
/// check can never observe an old role mixed with a new permission list. The
/// predicates themselves are pure and never fail: an empty permission set is
/// valid input that simply answers `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionState {
    pub member_id: Option<Uuid>,
    pub is_owner: bool,
    pub role: Option<Role>,
    permissions: BTreeSet<String>,
}

impl PermissionState {
    /// The state of a session with no active organisation: no grants, not an
    /// owner. Every check against it answers `false`.
    pub fn cleared() -> Self {
        Self {
            member_id: None,
            is_owner: false,
            role: None,
            permissions: BTreeSet::new(),
        }
    }

    /// Build the state from the permission source tuple, merging the role's
    /// permission list with the member's individual extras.
    pub fn from_grants<I, J>(
        member_id: Uuid,
        is_owner: bool,
        role: Option<Role>,
        permissions: I,
        extra_permissions: J,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let permissions = permissions
            .into_iter()
            .chain(extra_permissions)
            .collect::<BTreeSet<_>>();
        Self {
            member_id: Some(member_id),
            is_owner,
            role,
            permissions,
        }
    }

    /// `true` for owners, otherwise set membership.
    pub fn can(&self, permission: &str) -> bool {
        self.is_owner || self.permissions.contains(permission)
    }

    /// `true` for owners, otherwise whether at least one of `permissions` is
    /// granted. The vacuous "any" over an empty list is `false`.
    pub fn can_any<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.is_owner || permissions.into_iter().any(|p| self.permissions.contains(p))
    }

    /// `true` for owners, otherwise whether every one of `permissions` is
    /// granted. The vacuous "all" over an empty list is `true`.
    pub fn can_all<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.is_owner || permissions.into_iter().all(|p| self.permissions.contains(p))
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}
