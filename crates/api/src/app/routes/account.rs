use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::get};

use shelfwise_core::DomainError;
use shelfwise_infra::ServiceError;

use crate::app::dto::AccountSummary;
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/summary", get(summary))
}

/// GET /account/summary - any authenticated principal, for themselves.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let me = principal.principal_id();

    // Principals without a directory entry still get a summary.
    let display_name = match services.staff.get(me).await {
        Ok(account) => Some(account.display_name),
        Err(ServiceError::Domain(DomainError::NotFound(_))) => None,
        Err(e) => return Err(errors::service_error_to_response(e)),
    };
    let open_loan_titles = services
        .ledger
        .open_titles_for(me)
        .await
        .map_err(errors::service_error_to_response)?;
    let has_overdue_loans = services
        .ledger
        .has_overdue()
        .await
        .map_err(errors::service_error_to_response)?;

    Ok(Json(AccountSummary {
        principal_id: me,
        email: principal.email().map(str::to_string),
        display_name,
        roles: principal.roles().to_vec(),
        open_loan_titles,
        has_overdue_loans,
    })
    .into_response())
}
