use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_ttl_hours: i64,
    /// Upper bound for every store call, including connection checkout.
    pub store_timeout: Duration,
    pub db_max_connections: u32,
    pub cors_origin: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_issuer: env_or("JWT_ISSUER", "placement-portal".to_string())?,
            jwt_ttl_hours: env_or("JWT_TTL_HOURS", 24)?,
            store_timeout: Duration::from_millis(env_or("STORE_TIMEOUT_MS", 5_000)?),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173".to_string())?,
            port: env_or("PORT", 5000)?,
            rust_log: env_or("RUST_LOG", "info".to_string())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
