use stockhistory_auth::{Group, Principal};
use stockhistory_core::UserId;

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn groups(&self) -> &[Group] {
        &self.principal.groups
    }

    pub fn is_staff(&self) -> bool {
        self.principal.is_staff
    }
}
