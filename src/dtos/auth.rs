use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct TokenObtainRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct TokenRefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}
