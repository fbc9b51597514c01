use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto::WhoAmI;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(WhoAmI {
        principal_id: principal.principal_id(),
        email: principal.email().map(str::to_string),
        roles: principal.roles().to_vec(),
        permissions: principal.permissions().to_vec(),
    })
}
