//! Server configuration

use anyhow::Context;

/// Configuration loaded once at startup from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Direct (non-pooler) URL for migrations, if the deployment sits
    /// behind PgBouncer
    pub database_direct_url: Option<String>,
    pub bind_address: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub payment_webhook_secret: String,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = require_var("DATABASE_URL")?;
        let database_direct_url = std::env::var("DATABASE_DIRECT_URL").ok();
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let jwt_secret = require_var("JWT_SECRET")?;
        let jwt_expiry_hours = std::env::var("JWT_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("JWT_EXPIRY_HOURS must be a number")?;
        let payment_webhook_secret = require_var("PAYMENT_WEBHOOK_SECRET")?;

        // Default to localhost for development; production sets ALLOWED_ORIGINS
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a number")?;

        Ok(Self {
            database_url,
            database_direct_url,
            bind_address,
            jwt_secret,
            jwt_expiry_hours,
            payment_webhook_secret,
            allowed_origins,
            request_timeout_secs,
        })
    }
}

fn require_var(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}
