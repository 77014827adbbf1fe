use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Serialize, Deserialize};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub token_type: TokenKind,
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

pub fn sign_token(
    user_id: i64,
    username: &str,
    kind: TokenKind,
    ttl_seconds: i64,
    secret: &str,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        token_type: kind,
        jti: uuid::Uuid::new_v4().simple().to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

/// Decode `token` and insist it is of the `expected` kind.
pub fn verify_token(token: &str, expected: TokenKind, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|d| d.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
        AppError::invalid_token("Token is invalid or expired")
    })?;

    if claims.token_type != expected {
        return Err(AppError::invalid_token("Token has wrong type"));
    }
    Ok(claims)
}
