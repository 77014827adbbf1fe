use axum::{Router, routing::{post, get}, middleware};
use crate::state::AppState;
use crate::handlers::user::{register_user, list_users};
use crate::middleware::auth::enforce_access_policy;

pub fn routes(state: AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/users/register/", post(register_user));

    let guarded = Router::new()
        .route("/users/", get(list_users))
        .layer(middleware::from_fn_with_state(state, enforce_access_policy));

    open.merge(guarded)
}
