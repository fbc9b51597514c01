//! Catalog routes: CRUD, search, list view and spreadsheet import/export.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use shelfwise_auth::Permission;
use shelfwise_catalog::{CatalogItem, CatalogItemDraft, CatalogItemSnapshot};
use shelfwise_core::{CatalogItemId, ExpectedVersion};

use super::{XLSX, attachment};
use crate::app::dto::{self, CatalogSearchQuery, CatalogViewQuery, DeleteItemQuery, UpdateItemRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(search_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/view", get(list_view))
        .route("/form-options", get(form_options))
        .route("/import", post(import_items))
        .route("/import/template", get(import_template))
        .route("/export", get(export_items))
}

fn item_id(raw: &str) -> Result<CatalogItemId, axum::response::Response> {
    dto::parse_id(raw).map_err(errors::domain_error_to_response)
}

fn snapshots(items: Vec<CatalogItem>) -> Vec<CatalogItemSnapshot> {
    items.iter().map(CatalogItem::snapshot).collect()
}

pub async fn search_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<CatalogSearchQuery>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_READ)?;
    let filter = query.into_filter().map_err(errors::domain_error_to_response)?;

    let items = services
        .catalog
        .search(&filter)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(snapshots(items)).into_response())
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CatalogItemDraft>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_WRITE)?;

    let item = services
        .catalog
        .create(body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok((StatusCode::CREATED, Json(item.snapshot())).into_response())
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_READ)?;
    let id = item_id(&id)?;

    let item = services
        .catalog
        .get(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(item.snapshot()).into_response())
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateItemRequest>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_WRITE)?;
    let id = item_id(&id)?;
    let expected = body
        .expected_version
        .map_or(ExpectedVersion::Any, ExpectedVersion::Exact);

    let item = services
        .catalog
        .update(id, body.patch, expected)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(item.snapshot()).into_response())
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<DeleteItemQuery>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_WRITE)?;
    let id = item_id(&id)?;
    let mode = query.mode().map_err(errors::domain_error_to_response)?;

    let outcome = services
        .catalog
        .delete(id, mode)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(outcome).into_response())
}

pub async fn list_view(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<CatalogViewQuery>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_READ)?;
    let (subject, status) = query.parts().map_err(errors::domain_error_to_response)?;

    let view = services
        .catalog
        .list_view(subject, status)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(Json(view).into_response())
}

pub async fn form_options(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.form_options()).into_response())
}

/// POST /catalog/import - raw xlsx bytes as the request body.
pub async fn import_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_WRITE)?;
    if body.is_empty() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "request body must be an xlsx workbook",
        ));
    }

    let outcome = services
        .catalog
        .import_spreadsheet(&body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

pub async fn import_template(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_READ)?;
    let bytes = services
        .catalog
        .import_template()
        .map_err(errors::service_error_to_response)?;
    Ok(attachment(XLSX, "catalog_import_template.xlsx", bytes))
}

pub async fn export_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_READ)?;
    let bytes = services
        .catalog
        .export_spreadsheet()
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(attachment(XLSX, "catalog.xlsx", bytes))
}
