use axum::{routing::post, Router};
use crate::handlers::auth::{obtain_token, refresh_token};
use crate::state::AppState;

/// Token endpoints, mounted under `prefix` (`/api` and `/api/products/api`).
pub fn routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/token/"), post(obtain_token))
        .route(&format!("{prefix}/token/refresh/"), post(refresh_token))
}
