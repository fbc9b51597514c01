use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use shelfwise_core::UserId;

use crate::{JwtClaims, Permission, Role, role_permissions};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub principal_id: UserId,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve effective permissions from the roles in verified claims.
    pub fn from_claims(claims: &JwtClaims) -> Self {
        let mut seen = BTreeSet::new();
        let permissions = claims
            .roles
            .iter()
            .flat_map(role_permissions)
            .filter(|p| seen.insert(p.as_str().to_string()))
            .collect();
        Self {
            principal_id: claims.sub,
            email: claims.email.clone(),
            roles: claims.roles.clone(),
            permissions,
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::ADMIN)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("account is locked")]
    Locked,
}

/// Pure policy check; no IO.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required)
    {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
