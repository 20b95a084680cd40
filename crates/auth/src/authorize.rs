use thiserror::Error;

use crate::{Group, Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: not a member of group '{0}'")]
    NotInGroup(String),

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Site-specific access policy, built from plugin settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// When set, only members of this group may view history.
    pub allowed_group: Option<Group>,
}

impl AccessPolicy {
    pub fn restricted_to(group: Group) -> Self {
        Self {
            allowed_group: Some(group),
        }
    }
}

/// Decide whether `principal` holds `required` under `policy`.
///
/// - Staff users hold every permission.
/// - Explicit permissions in the token (including `"*"`) are honoured.
/// - Viewing history is open to everyone unless the policy names a group.
/// - Everything else is staff-only.
///
/// No IO, no panics.
pub fn authorize(
    principal: &Principal,
    required: &Permission,
    policy: &AccessPolicy,
) -> Result<(), AuthzError> {
    if principal.is_staff || principal.has_permission(required) {
        return Ok(());
    }

    if *required == Permission::VIEW_HISTORY {
        return match &policy.allowed_group {
            None => Ok(()),
            Some(group) if principal.in_group(group) => Ok(()),
            Some(group) => Err(AuthzError::NotInGroup(group.to_string())),
        };
    }

    Err(AuthzError::Forbidden(required.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhistory_core::UserId;

    fn principal(groups: &[&'static str], is_staff: bool) -> Principal {
        Principal {
            user_id: UserId::new(1),
            username: "carol".to_string(),
            groups: groups.iter().map(|g| Group::new(*g)).collect(),
            is_staff,
            permissions: vec![],
        }
    }

    #[test]
    fn view_is_open_without_a_group_restriction() {
        let p = principal(&[], false);
        assert_eq!(authorize(&p, &Permission::VIEW_HISTORY, &AccessPolicy::default()), Ok(()));
    }

    #[test]
    fn view_requires_membership_when_restricted() {
        let policy = AccessPolicy::restricted_to(Group::new("stock"));

        let outsider = principal(&["sales"], false);
        assert_eq!(
            authorize(&outsider, &Permission::VIEW_HISTORY, &policy),
            Err(AuthzError::NotInGroup("stock".to_string()))
        );

        let member = principal(&["sales", "stock"], false);
        assert_eq!(authorize(&member, &Permission::VIEW_HISTORY, &policy), Ok(()));
    }

    #[test]
    fn staff_bypasses_everything() {
        let policy = AccessPolicy::restricted_to(Group::new("stock"));
        let staff = principal(&[], true);
        assert_eq!(authorize(&staff, &Permission::VIEW_HISTORY, &policy), Ok(()));
        assert_eq!(authorize(&staff, &Permission::CHANGE_SETTINGS, &policy), Ok(()));
    }

    #[test]
    fn settings_are_staff_only_unless_granted() {
        let mut p = principal(&["stock"], false);
        assert!(authorize(&p, &Permission::CHANGE_SETTINGS, &AccessPolicy::default()).is_err());

        p.permissions.push(Permission::new("*"));
        assert_eq!(
            authorize(&p, &Permission::CHANGE_SETTINGS, &AccessPolicy::default()),
            Ok(())
        );
    }
}
