use shelfwise_auth::{Permission, Principal, Role};
use shelfwise_core::UserId;

/// Principal context for a request (authenticated identity + effective permissions).
///
/// Inserted by the auth middleware; present on every protected route.
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

    pub fn principal_id(&self) -> UserId {
        self.principal.principal_id
    }

    pub fn email(&self) -> Option<&str> {
        self.principal.email.as_deref()
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.principal.permissions
    }
}
