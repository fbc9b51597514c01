use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use shelfwise_auth::{AuthzError, JwtClaims, JwtValidator, Principal};
use shelfwise_core::Clock;
use shelfwise_infra::StaffDirectory;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub staff: StaffDirectory,
    pub clock: Arc<dyn Clock>,
}

/// Verify the bearer token, resolve permissions from the directory roles (or
/// the token's, for principals without an entry), and reject locked accounts.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .map_err(|status| errors::json_error(status, "unauthenticated", "missing bearer token"))?;

    let claims = state.jwt.validate(token, state.clock.now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string())
    })?;

    // Directory entries override the token's roles, so role changes apply
    // to tokens already issued.
    let account = state
        .staff
        .find(claims.sub)
        .await
        .map_err(errors::service_error_to_response)?;
    let claims = match account {
        Some(account) if account.locked => {
            tracing::info!(principal_id = %claims.sub, "locked account refused");
            return Err(errors::authz_error_to_response(AuthzError::Locked));
        }
        Some(account) => JwtClaims {
            roles: account.roles,
            ..claims
        },
        None => claims,
    };

    req.extensions_mut()
        .insert(PrincipalContext::new(Principal::from_claims(&claims)));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer  abc.def "),
        );
        assert_eq!(extract_bearer(&headers), Ok("abc.def"));
    }
}
