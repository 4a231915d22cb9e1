//! Application configuration

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite connection URL
    pub database_url: String,

    /// HTTP listen address
    pub server_host: String,

    /// HTTP listen port
    pub server_port: u16,

    /// CORS allowed origins (comma-separated, or "*" for any)
    pub cors_allowed_origins: Vec<String>,

    /// Availability snapshot freshness window
    pub cache_ttl: Duration,

    /// Upper bound on any single store operation
    pub store_timeout: Duration,

    /// Rolling provisioning window length, in days
    pub provision_days: u64,

    /// How often the lifecycle worker re-runs provisioning and cleanup
    pub lifecycle_interval: Duration,

    /// Mail relay settings; confirmations are skipped when unset
    pub mail: Option<MailConfig>,
}

/// Outbound mail relay configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub relay_url: String,
    pub relay_token: String,
    pub from_address: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:slots.db?mode=rwc".to_string()),

            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            cache_ttl: Duration::from_secs(
                env::var("CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            ),

            store_timeout: Duration::from_secs(
                env::var("STORE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            ),

            provision_days: env::var("PROVISION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),

            lifecycle_interval: Duration::from_secs(
                env::var("LIFECYCLE_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
            ),

            mail: MailConfig::from_env(),
        })
    }

    /// The socket address to bind, from `SERVER_HOST` and `SERVER_PORT`.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let host: IpAddr = self
            .server_host
            .parse()
            .context("SERVER_HOST must be a valid IP address")?;
        Ok(SocketAddr::new(host, self.server_port))
    }
}

impl MailConfig {
    fn from_env() -> Option<Self> {
        let relay_url = env::var("MAIL_RELAY_URL").ok()?;
        let relay_token = env::var("MAIL_RELAY_TOKEN").ok()?;
        let from_address =
            env::var("MAIL_FROM").unwrap_or_else(|_| "bookings@slotcast.local".to_string());
        Some(Self {
            relay_url,
            relay_token,
            from_address,
        })
    }
}
