use axum::{
    routing::get,
    Router, middleware,
};
use crate::handlers::product::{
    get_products, get_product, create_product, search_products
};
use crate::middleware::auth::enforce_access_policy;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    // reads and writes are gated separately by the configured policy
    Router::new()
        .route("/products/", get(get_products).post(create_product))
        .route("/products/search/", get(search_products))
        .route("/products/{id}/", get(get_product))
        .layer(middleware::from_fn_with_state(state, enforce_access_policy))
}
