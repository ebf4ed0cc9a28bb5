//! Configuration module
//!
//! Loads configuration from environment variables once at startup. The
//! resulting values are handed to the components that need them; nothing
//! below `main` reads the environment.

use chrono::Duration;
use std::env;

/// Signing and validation parameters for access tokens
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC-SHA256 shared secret
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Access token lifetime
    pub token_lifetime: Duration,
}

/// Per-IP limiter applied to the auth endpoints
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub enabled: bool,
    /// Seconds between replenished permits
    pub replenish_seconds: u64,
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            replenish_seconds: 2,
            burst_size: 10,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Postgres connection string; in-memory stores are used when absent
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    pub jwt: JwtSettings,
    pub rate_limit: RateLimitSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("PORT", 8080)?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5)?;

        let lifetime_minutes: i64 = parse_or("JWT_TOKEN_LIFETIME_MINUTES", 60)?;
        if lifetime_minutes <= 0 {
            return Err(ConfigError::InvalidValue("JWT_TOKEN_LIFETIME_MINUTES"));
        }

        let jwt = JwtSettings {
            secret: required("JWT_SECRET")?,
            issuer: required("JWT_ISSUER")?,
            audience: required("JWT_AUDIENCE")?,
            token_lifetime: Duration::minutes(lifetime_minutes),
        };

        let defaults = RateLimitSettings::default();
        let rate_limit = RateLimitSettings {
            enabled: parse_or("RATE_LIMIT_ENABLED", defaults.enabled)?,
            replenish_seconds: parse_or("RATE_LIMIT_REPLENISH_SECONDS", defaults.replenish_seconds)?,
            burst_size: parse_or("RATE_LIMIT_BURST", defaults.burst_size)?,
        };

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections,
            jwt,
            rate_limit,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(key)),
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back_to_default() {
        let value: u16 = parse_or("CATALOG_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("CATALOG_TEST_BAD_PORT", "eighty");
        let result: Result<u16, _> = parse_or("CATALOG_TEST_BAD_PORT", 8080);
        assert!(matches!(result, Err(ConfigError::InvalidValue("CATALOG_TEST_BAD_PORT"))));
    }

    #[test]
    fn test_required_rejects_blank_values() {
        env::set_var("CATALOG_TEST_BLANK_SECRET", "   ");
        assert!(matches!(
            required("CATALOG_TEST_BLANK_SECRET"),
            Err(ConfigError::MissingEnv(_))
        ));
    }
}
