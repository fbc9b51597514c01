use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::IntoResponse,
    routing::get,
};

use shelfwise_auth::Permission;

use super::{XLSX, attachment};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/summary/export", get(export_summary))
}

/// GET /reports/summary - recomputed on every call.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::REPORTS_READ)?;
    let summary = services
        .reports
        .summary()
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(summary).into_response())
}

pub async fn export_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::REPORTS_READ)?;
    let bytes = services
        .reports
        .summary_workbook()
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(attachment(XLSX, "library_summary.xlsx", bytes))
}
