//! API-side authorization guard.
//!
//! Handlers call this before touching a store. The access policy comes from
//! the current plugin settings, so a `USER_GROUP` change applies to the next
//! request.

use stockhistory_auth::{AccessPolicy, AuthzError, Group, Permission, authorize};
use stockhistory_history::HistorySettings;

use crate::context::PrincipalContext;

pub fn policy_from_settings(settings: &HistorySettings) -> AccessPolicy {
    match &settings.user_group {
        Some(group) => AccessPolicy::restricted_to(Group::new(group.clone())),
        None => AccessPolicy::default(),
    }
}

/// Check that the caller holds `required` under the current settings.
pub fn authorize_request(
    principal: &PrincipalContext,
    required: &Permission,
    settings: &HistorySettings,
) -> Result<(), AuthzError> {
    authorize(principal.principal(), required, &policy_from_settings(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhistory_auth::Principal;
    use stockhistory_core::UserId;

    fn caller(groups: &[&'static str], is_staff: bool) -> PrincipalContext {
        PrincipalContext::new(Principal {
            user_id: UserId::new(7),
            username: "dana".to_string(),
            groups: groups.iter().map(|g| Group::new(*g)).collect(),
            is_staff,
            permissions: vec![],
        })
    }

    #[test]
    fn group_setting_restricts_viewing() {
        let mut settings = HistorySettings::default();
        assert!(authorize_request(&caller(&[], false), &Permission::VIEW_HISTORY, &settings).is_ok());

        settings.user_group = Some("stock".to_string());
        assert!(authorize_request(&caller(&[], false), &Permission::VIEW_HISTORY, &settings).is_err());
        assert!(authorize_request(&caller(&["stock"], false), &Permission::VIEW_HISTORY, &settings).is_ok());
        assert!(authorize_request(&caller(&[], true), &Permission::VIEW_HISTORY, &settings).is_ok());
    }

    #[test]
    fn settings_changes_are_staff_only() {
        let settings = HistorySettings::default();
        assert!(authorize_request(&caller(&["stock"], false), &Permission::CHANGE_SETTINGS, &settings).is_err());
        assert!(authorize_request(&caller(&[], true), &Permission::CHANGE_SETTINGS, &settings).is_ok());
    }
}
