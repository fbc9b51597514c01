//! Loan routes: checkout, return, listings and receipts.
//!
//! Holders of `loans.read` without `loans.read_all` only see the loans they
//! registered themselves.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio_stream::StreamExt;

use shelfwise_auth::{Permission, authorize};
use shelfwise_core::{CatalogItemId, DomainError, LoanId};
use shelfwise_documents::receipt_file_name;
use shelfwise_loans::Loan;

use super::{PDF, attachment};
use crate::app::dto::{self, ActiveLoansQuery, CheckoutRequest, LoanDetail, LoanListQuery};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(checkout).get(list_loans))
        .route("/active", get(list_active))
        .route("/:id", get(get_loan))
        .route("/:id/return", post(return_loan))
        .route("/:id/receipt", get(download_receipt))
}

fn loan_id(raw: &str) -> Result<LoanId, Response> {
    dto::parse_id(raw).map_err(errors::domain_error_to_response)
}

fn reads_all(principal: &PrincipalContext) -> bool {
    authorize(principal.principal(), &Permission::LOANS_READ_ALL).is_ok()
}

/// Load a loan the principal may see. Other people's loans read as missing.
async fn visible_loan(
    services: &AppServices,
    principal: &PrincipalContext,
    id: LoanId,
) -> Result<Loan, Response> {
    let loan = services
        .ledger
        .get(id)
        .await
        .map_err(errors::service_error_to_response)?;
    if !reads_all(principal) && loan.borrower_id() != principal.principal_id() {
        return Err(errors::domain_error_to_response(DomainError::not_found(format!(
            "loan {id}"
        ))));
    }
    Ok(loan)
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CheckoutRequest>,
) -> ApiResult {
    require(&principal, &Permission::LOANS_WRITE)?;
    let item_id: CatalogItemId =
        dto::parse_id(&body.item_id).map_err(errors::domain_error_to_response)?;

    let loan = services
        .ledger
        .checkout(item_id, body.borrower(), principal.principal_id())
        .await
        .map_err(errors::service_error_to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(LoanDetail::new(&loan, services.clock.now())),
    )
        .into_response())
}

pub async fn list_loans(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<LoanListQuery>,
) -> ApiResult {
    require(&principal, &Permission::LOANS_READ)?;
    let filter = query.filter().map_err(errors::domain_error_to_response)?;

    let mut views = services
        .ledger
        .list_by_status(filter)
        .await
        .map_err(errors::service_error_to_response)?;
    if !reads_all(&principal) {
        let me = principal.principal_id();
        views.retain(|v| v.loan.borrower_id == me);
    }
    Ok(Json(views).into_response())
}

pub async fn list_active(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ActiveLoansQuery>,
) -> ApiResult {
    require(&principal, &Permission::LOANS_READ_ALL)?;

    let stream = services
        .ledger
        .list_active(query.sort_by_due())
        .await
        .map_err(errors::service_error_to_response)?;
    let now = services.clock.now();
    let loans: Vec<LoanDetail> = stream.map(|loan| LoanDetail::new(&loan, now)).collect().await;
    Ok(Json(loans).into_response())
}

pub async fn get_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::LOANS_READ)?;
    let id = loan_id(&id)?;

    let loan = visible_loan(&services, &principal, id).await?;
    Ok(Json(LoanDetail::new(&loan, services.clock.now())).into_response())
}

pub async fn return_loan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::LOANS_WRITE)?;
    let id = loan_id(&id)?;

    let loan = services
        .ledger
        .return_loan(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(LoanDetail::new(&loan, services.clock.now())).into_response())
}

pub async fn download_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::LOANS_READ)?;
    let id = loan_id(&id)?;
    visible_loan(&services, &principal, id).await?;

    let pdf = services
        .ledger
        .receipt(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(attachment(PDF, &receipt_file_name(id), pdf))
}
