//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: composition root (store, clock, receipt archive, services)
//! - `routes/`: HTTP routes + handlers, one file per area
//! - `dto.rs`: request/response DTOs and query parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, extract::DefaultBodyLimit, routing::get};
use tower::ServiceBuilder;

use shelfwise_auth::Hs256JwtValidator;
use shelfwise_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, StartupError};

/// Spreadsheet uploads are larger than axum's 2 MiB default.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> Result<Router, StartupError> {
    let services = services::build_services(&config).await?;
    Ok(router(Arc::new(services), &config.jwt_secret))
}

/// Router over already-wired services.
pub fn router(services: Arc<AppServices>, jwt_secret: &str) -> Router {
    let auth_state = middleware::AuthState {
        jwt: Arc::new(Hs256JwtValidator::new(jwt_secret.as_bytes())),
        staff: services.staff.clone(),
        clock: services.clock.clone(),
    };

    // Protected routes: require a valid, unlocked principal.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
