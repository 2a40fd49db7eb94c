//! Server configuration

use crate::auth::JwtConfig;
use crate::checkout::CheckoutPolicy;
use std::time::Duration;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | DATABASE_PATH | storefront.db | SQLite database file |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | LOG_DIR | (unset) | daily-rolling log directory |
/// | CHECKOUT_DEADLINE_MS | 10000 | whole-checkout deadline |
/// | CHECKOUT_MAX_RETRIES | 3 | write-conflict retries |
/// | JWT_SECRET | (dev fallback) | token signing secret |
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path
    pub database_path: String,
    /// HTTP API port
    pub http_port: u16,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Optional directory for rolling file logs
    pub log_dir: Option<String>,
    /// Checkout deadline and retry policy
    pub checkout: CheckoutPolicy,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults when unset
    pub fn from_env() -> Self {
        let deadline_ms = std::env::var("CHECKOUT_DEADLINE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        let max_retries = std::env::var("CHECKOUT_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "storefront.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            checkout: CheckoutPolicy {
                deadline: Duration::from_millis(deadline_ms),
                max_retries,
                ..CheckoutPolicy::default()
            },
        }
    }
}
