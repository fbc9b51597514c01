use axum::{Router, routing::get};

pub mod account;
pub mod admin;
pub mod catalog;
pub mod loans;
pub mod reports;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/catalog", catalog::router())
        .nest("/loans", loans::router())
        .nest("/reports", reports::router())
        .nest("/account", account::router())
        .nest("/admin", admin::router())
}

/// Binary download with a suggested file name.
pub(crate) fn attachment(
    content_type: &'static str,
    file_name: &str,
    bytes: Vec<u8>,
) -> axum::response::Response {
    use axum::http::header;
    use axum::response::IntoResponse;

    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub(crate) const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub(crate) const PDF: &str = "application/pdf";
