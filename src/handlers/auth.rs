use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use crate::auth::jwt::{verify_token, TokenKind};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{issue_access, issue_pair};
use crate::dtos::auth::{TokenObtainRequest, TokenPairResponse, TokenRefreshRequest, TokenRefreshResponse};
use crate::error::{AppError, FieldErrors};
use crate::models::user::User;
use crate::state::AppState;
use crate::validation::REQUIRED;

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

// POST /token/ - Exchange credentials for an access/refresh pair
#[instrument(skip(state, payload))]
pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenObtainRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if payload.username.trim().is_empty() {
        errors.add("username", REQUIRED);
    }
    if payload.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    errors.into_result()?;

    let found = state.users.find_by_username(payload.username.trim()).await?;
    let user = check_credentials(found, &payload.password, state.config.auth.bcrypt_cost)?;

    let pair = issue_pair(&user, &state.config.auth)?;
    state.users.record_login(user.id).await?;

    info!(user_id = user.id, "Issued token pair");
    Ok(Json(TokenPairResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

/// Unknown usernames still pay for one bcrypt round, and the password is
/// checked before `is_active`, so response time does not reveal which
/// accounts exist.
fn check_credentials(user: Option<User>, password: &str, cost: u32) -> Result<User, AppError> {
    let Some(user) = user else {
        hash_password(password, cost)?;
        return Err(AppError::authentication(BAD_CREDENTIALS));
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "Rejected login with wrong password");
        return Err(AppError::authentication(BAD_CREDENTIALS));
    }
    if !user.is_active {
        warn!(user_id = user.id, "Rejected login for inactive account");
        return Err(AppError::authentication(BAD_CREDENTIALS));
    }
    Ok(user)
}

// POST /token/refresh/ - Trade a refresh token for a new access token
#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRefreshRequest>, JsonRejection>,
) -> Result<Json<TokenRefreshResponse>, AppError> {
    let Json(payload) = payload?;
    if payload.refresh.trim().is_empty() {
        return Err(AppError::validation("refresh", REQUIRED));
    }

    let claims = verify_token(
        payload.refresh.trim(),
        TokenKind::Refresh,
        state.config.auth.jwt_secret.expose_secret(),
    )?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::invalid_token("User not found or inactive"))?;

    Ok(Json(TokenRefreshResponse {
        access: issue_access(&user, &state.config.auth)?,
    }))
}
