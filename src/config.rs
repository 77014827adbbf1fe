//! Process configuration, read once at startup from environment variables.
//!
//! Everything the handlers need to know about policy (who may read, who may
//! write, how search matches, token lifetimes) lives here and travels inside
//! `AppState` instead of being looked up from the environment per request.

use std::net::IpAddr;

use secrecy::SecretString;
use thiserror::Error;

use crate::search::SearchPolicy;

const MIN_JWT_SECRET_LENGTH: usize = 16;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ACCESS_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which requests must carry a valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Open,
    Authenticated,
}

impl AccessPolicy {
    fn parse(key: &str, raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "authenticated" => Ok(Self::Authenticated),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected open|authenticated, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub reads: AccessPolicy,
    pub writes: AccessPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<SecretString>,
    pub host: IpAddr,
    pub port: u16,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
    pub search: SearchPolicy,
    /// When false, products with a negative price are rejected.
    pub allow_negative_price: bool,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = match get("STORAGE").as_deref().map(str::trim) {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORAGE".into(),
                    format!("expected postgres|memory, got {other:?}"),
                ))
            }
        };

        let database_url = get("DATABASE_URL").map(SecretString::from);
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".into()));
        }

        let host = match get("HOST") {
            Some(h) => h
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidEnvVar("HOST".into(), format!("{e}")))?,
            None => IpAddr::from([127, 0, 0, 1]),
        };
        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".into()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_SECRET".into(),
                format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
            ));
        }

        let access_ttl_seconds = parse_or("ACCESS_TOKEN_TTL_SECONDS", get("ACCESS_TOKEN_TTL_SECONDS"), DEFAULT_ACCESS_TTL_SECONDS)?;
        let refresh_ttl_seconds = parse_or("REFRESH_TOKEN_TTL_SECONDS", get("REFRESH_TOKEN_TTL_SECONDS"), DEFAULT_REFRESH_TTL_SECONDS)?;
        if access_ttl_seconds <= 0 || refresh_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ACCESS_TOKEN_TTL_SECONDS/REFRESH_TOKEN_TTL_SECONDS".into(),
                "token lifetimes must be positive".into(),
            ));
        }

        let bcrypt_cost = parse_or("BCRYPT_COST", get("BCRYPT_COST"), bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidEnvVar("BCRYPT_COST".into(), "must be between 4 and 31".into()));
        }

        let reads = match get("AUTH_READS") {
            Some(raw) => AccessPolicy::parse("AUTH_READS", &raw)?,
            None => AccessPolicy::Open,
        };
        let writes = match get("AUTH_WRITES") {
            Some(raw) => AccessPolicy::parse("AUTH_WRITES", &raw)?,
            None => AccessPolicy::Authenticated,
        };

        let default_page_size = parse_or("PAGE_SIZE", get("PAGE_SIZE"), DEFAULT_PAGE_SIZE)?;
        let max_page_size = parse_or("MAX_PAGE_SIZE", get("MAX_PAGE_SIZE"), DEFAULT_MAX_PAGE_SIZE)?;
        if default_page_size == 0 || max_page_size < default_page_size {
            return Err(ConfigError::InvalidEnvVar(
                "PAGE_SIZE".into(),
                "PAGE_SIZE must be positive and not exceed MAX_PAGE_SIZE".into(),
            ));
        }

        let search = SearchPolicy::from_settings(get("SEARCH_FIELDS").as_deref(), get("SEARCH_MODE").as_deref())
            .map_err(|msg| ConfigError::InvalidEnvVar("SEARCH_FIELDS/SEARCH_MODE".into(), msg))?;

        let allow_negative_price = parse_bool("ALLOW_NEGATIVE_PRICE", get("ALLOW_NEGATIVE_PRICE"))?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".into(),
                    format!("expected text|json, got {other:?}"),
                ))
            }
        };

        Ok(Self {
            storage,
            database_url,
            host,
            port,
            auth: AuthConfig {
                jwt_secret: SecretString::from(jwt_secret),
                access_ttl_seconds,
                refresh_ttl_seconds,
                bcrypt_cost,
                reads,
                writes,
            },
            pagination: PaginationConfig {
                default_page_size,
                max_page_size,
            },
            search,
            allow_negative_price,
            cors_allowed_origins,
            log_format,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), format!("{e}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got {v:?}"))),
        },
    }
}
