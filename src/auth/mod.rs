pub mod jwt;
pub mod password;

use secrecy::ExposeSecret;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::models::user::User;
use jwt::{sign_token, TokenKind};

pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_pair(user: &User, auth: &AuthConfig) -> Result<TokenPair, AppError> {
    let secret = auth.jwt_secret.expose_secret();
    Ok(TokenPair {
        access: sign_token(user.id, &user.username, TokenKind::Access, auth.access_ttl_seconds, secret)?,
        refresh: sign_token(user.id, &user.username, TokenKind::Refresh, auth.refresh_ttl_seconds, secret)?,
    })
}

pub fn issue_access(user: &User, auth: &AuthConfig) -> Result<String, AppError> {
    sign_token(
        user.id,
        &user.username,
        TokenKind::Access,
        auth.access_ttl_seconds,
        auth.jwt_secret.expose_secret(),
    )
}
