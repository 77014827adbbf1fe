use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use secrecy::ExposeSecret;

use crate::auth::jwt::{verify_token, TokenKind};
use crate::config::AccessPolicy;
use crate::error::AppError;
use crate::state::AppState;

/// Who made the request, taken from a verified access token.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

/// Gate a route group on the configured read/write policy.
///
/// Safe methods (GET, HEAD, OPTIONS) use the read policy, everything else the
/// write policy. A bearer token that is present is always verified, even on
/// open routes, so a bad token never passes silently. Other authorization
/// schemes are ignored on open routes and the caller stays anonymous.
pub async fn enforce_access_policy(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let policy = if is_safe(req.method()) {
        state.config.auth.reads
    } else {
        state.config.auth.writes
    };

    if policy == AccessPolicy::Open && !has_bearer(req.headers()) {
        return next.run(req).await;
    }

    match authenticate(req.headers(), state.config.auth.jwt_secret.expose_secret()) {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

fn is_safe(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
}

fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::authentication("Authentication credentials were not provided."))?;

    // Expect "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::authentication("Invalid Authorization format"))?;

    let claims = verify_token(token, TokenKind::Access, secret)?;
    Ok(AuthContext {
        user_id: claims.sub,
        username: claims.username,
    })
}
