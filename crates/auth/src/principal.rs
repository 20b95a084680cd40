use stockhistory_core::UserId;

use crate::{Group, JwtClaims, Permission};

/// A resolved caller, derived from validated claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub groups: Vec<Group>,
    pub is_staff: bool,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn in_group(&self, group: &Group) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| p.is_wildcard() || p == permission)
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            groups: claims.groups,
            is_staff: claims.is_staff,
            permissions: claims.permissions,
        }
    }
}
