//! API-side authorization guard.
//!
//! Handlers call [`require`] before touching any service, so domain and infra
//! code stay auth-agnostic.

use axum::response::Response;

use shelfwise_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the current principal holds `permission`.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), Response> {
    authorize(principal.principal(), permission).map_err(|e| {
        tracing::debug!(
            principal_id = %principal.principal_id(),
            permission = %permission,
            "request denied"
        );
        errors::authz_error_to_response(e)
    })
}
