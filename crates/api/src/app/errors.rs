//! Consistent JSON error responses: `{ "error": code, "message": text }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use shelfwise_auth::AuthzError;
use shelfwise_core::DomainError;
use shelfwise_documents::ImportError;
use shelfwise_infra::ServiceError;

/// Handlers return the error side already rendered.
pub type ApiResult = Result<Response, Response>;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Unavailable(_)
        | DomainError::AlreadyReturned(_)
        | DomainError::Conflict(_)
        | DomainError::ConcurrentModification(_) => StatusCode::CONFLICT,
        DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Unauthorized => StatusCode::FORBIDDEN,
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    json_error(domain_status(&err), err.code(), err.to_string())
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Import(e) => import_error_to_response(e),
        ServiceError::Document(e) => {
            tracing::error!(error = %e, "document rendering failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "document_failed", e.to_string())
        }
        ServiceError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_failure", msg)
        }
    }
}

fn import_error_to_response(err: ImportError) -> Response {
    let row = match &err {
        ImportError::Row { row, .. } => Some(*row),
        _ => None,
    };
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "import_failed",
            "message": err.to_string(),
            "row": row,
        })),
    )
        .into_response()
}

pub fn authz_error_to_response(err: AuthzError) -> Response {
    match err {
        AuthzError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        AuthzError::Locked => json_error(StatusCode::FORBIDDEN, "account_locked", err.to_string()),
    }
}
