//! Staff directory administration.
//!
//! The configured primary administrator is read-only here, and nobody can
//! lock their own account.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use shelfwise_auth::{Permission, Role};
use shelfwise_core::UserId;

use crate::app::dto::{self, AssignRoleRequest, CreateUserRequest, UpdateUserRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/roles", post(assign_role))
        .route("/users/:id/roles/:role", delete(revoke_role))
        .route("/users/:id/lock", post(lock_user))
        .route("/users/:id/unlock", post(unlock_user))
}

fn user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    dto::parse_id(raw).map_err(errors::domain_error_to_response)
}

fn parse_role(raw: &str) -> Result<Role, axum::response::Response> {
    Role::parse(raw).map_err(errors::domain_error_to_response)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /admin/users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let role = parse_role(&body.role)?;

    let account = services
        .staff
        .create(&body.email, &body.display_name, role)
        .await
        .map_err(errors::service_error_to_response)?;

    tracing::info!(
        actor = %principal.principal_id(),
        account_id = %account.id,
        "staff account created"
    );
    Ok((StatusCode::CREATED, Json(account)).into_response())
}

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let accounts = services
        .staff
        .list()
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(accounts).into_response())
}

/// GET /admin/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let id = user_id(&id)?;
    let account = services
        .staff
        .get(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(account).into_response())
}

/// PUT /admin/users/:id - change the email address.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let id = user_id(&id)?;
    let account = services
        .staff
        .change_email(id, &body.email)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(account).into_response())
}

/// POST /admin/users/:id/roles
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<AssignRoleRequest>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let id = user_id(&id)?;
    let role = parse_role(&body.role)?;
    let account = services
        .staff
        .assign_role(id, role)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(account).into_response())
}

/// DELETE /admin/users/:id/roles/:role
pub async fn revoke_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, role_name)): Path<(String, String)>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let id = user_id(&id)?;
    let role = parse_role(&role_name)?;
    let account = services
        .staff
        .revoke_role(id, &role)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(account).into_response())
}

/// POST /admin/users/:id/lock
pub async fn lock_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let id = user_id(&id)?;
    let account = services
        .staff
        .lock(principal.principal_id(), id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(account).into_response())
}

/// POST /admin/users/:id/unlock
pub async fn unlock_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::ADMIN_USERS)?;
    let id = user_id(&id)?;
    let account = services
        .staff
        .unlock(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(account).into_response())
}
