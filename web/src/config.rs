//! Configuration loaded from environment variables with defaults.

use std::env;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Postgres connection URL. Absent means the in-memory backend, which
    /// only makes sense for local development.
    pub database_url: Option<String>,
    /// Platform fee in whole percent of the order amount.
    pub platform_fee_percent: u8,
    /// Payment provider credentials.
    pub providers: ProvidersConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

/// Payment provider credentials and request policy.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// Stripe API secret key.
    pub stripe_secret_key: Option<String>,
    /// Stripe webhook signing secret.
    pub stripe_webhook_secret: Option<String>,
    /// Paystack API secret key (also signs webhooks).
    pub paystack_secret_key: Option<String>,
    /// Bound on each outbound provider request.
    pub timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
            },
            database_url: env::var("DATABASE_URL").ok(),
            platform_fee_percent: env::var("PLATFORM_FEE_PERCENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            providers: ProvidersConfig {
                stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok(),
                stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
                paystack_secret_key: env::var("PAYSTACK_SECRET_KEY").ok(),
                timeout: Duration::from_secs(
                    env::var("PROVIDER_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(15),
                ),
            },
        }
    }
}
