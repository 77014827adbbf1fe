pub mod auth;
pub mod products;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    let catalog = Router::new()
        .merge(users::routes(state.clone()))
        .merge(products::routes(state))
        .merge(auth::routes("/api"));

    Router::new()
        .merge(auth::routes("/api"))
        .nest("/api/products", catalog)
}
