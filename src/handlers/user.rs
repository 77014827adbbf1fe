use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::auth::password::hash_password;
use crate::dtos::pagination::{page_request, Page};
use crate::dtos::user::{RegisterUserRequest, UserListQuery, UserResponse};
use crate::error::{AppError, FieldErrors};
use crate::models::user::NewUser;
use crate::state::AppState;
use crate::store::StoreError;

fn map_unique_violation(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation("username") => {
            AppError::validation("username", "A user with that username already exists.")
        }
        StoreError::UniqueViolation("email") => {
            AppError::validation("email", "A user with that email already exists.")
        }
        other => other.into(),
    }
}

// POST /users/register/ - Create an account
#[instrument(skip(state, payload))]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(payload) = payload?;
    let registration = payload.validate()?;

    let password_hash = hash_password(&registration.password, state.config.auth.bcrypt_cost)?;

    let user = state
        .users
        .insert(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
            first_name: registration.first_name,
            last_name: registration.last_name,
        })
        .await
        .map_err(map_unique_violation)?;

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// GET /users/ - List users
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<UserListQuery>, QueryRejection>,
) -> Result<Json<Page<UserResponse>>, AppError> {
    let Query(params) = params?;
    let mut errors = FieldErrors::new();
    let page = page_request(
        params.page.as_deref(),
        params.page_size.as_deref(),
        &state.config.pagination,
        &mut errors,
    );
    errors.into_result()?;

    let users = state.users.list(page).await?;
    Ok(Json(Page::from_paged(users, page)?))
}
