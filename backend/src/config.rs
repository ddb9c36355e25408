//! Configuration management for the Course Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LMS_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Payment gateway configuration
    pub payment: PaymentConfig,

    /// Media CDN configuration for signed uploads
    #[serde(default)]
    pub media: MediaConfig,

    /// Chat bot used for staff notifications
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Inbound email webhook configuration
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Gateway API key (`RT-UDDOKTAPAY-API-KEY`)
    pub api_key: Option<String>,

    /// Gateway API base URL, without trailing slash
    pub base_url: String,

    /// Optional IPN URL forwarded with every checkout
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MediaConfig {
    /// CDN cloud name
    pub cloud_name: Option<String>,

    /// CDN API key (public)
    pub api_key: Option<String>,

    /// CDN API secret used for signing
    pub api_secret: Option<String>,
}

/// Fully configured media credentials
#[derive(Debug, Clone)]
pub struct MediaCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl MediaConfig {
    /// All three credentials, or `None` when any is missing or blank
    pub fn credentials(&self) -> Option<MediaCredentials> {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Some(MediaCredentials {
            cloud_name: non_blank(&self.cloud_name)?,
            api_key: non_blank(&self.api_key)?,
            api_secret: non_blank(&self.api_secret)?,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Bot token; notifications are skipped when unset
    pub bot_token: Option<String>,

    /// Target chat ID
    pub chat_id: Option<String>,

    /// Bot API base URL
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api_base(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    /// Shared secret for `x-webhook-signature`; verification is off when unset
    pub webhook_secret: Option<String>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("LMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 2_592_000)?
            .set_default("payment.base_url", "https://sandbox.uddoktapay.com/api")?
            .set_default("telegram.api_base", default_telegram_api_base())?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LMS_ prefix)
            .add_source(
                Environment::with_prefix("LMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Whether the service runs in development mode
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_credentials_require_all_fields() {
        let partial = MediaConfig {
            cloud_name: Some("demo".to_string()),
            api_key: Some("123".to_string()),
            api_secret: Some("  ".to_string()),
        };
        assert!(partial.credentials().is_none());

        let full = MediaConfig {
            api_secret: Some("s3cret".to_string()),
            ..partial
        };
        let creds = full.credentials().unwrap();
        assert_eq!(creds.cloud_name, "demo");
        assert_eq!(creds.api_secret, "s3cret");
    }

    #[test]
    fn test_telegram_default_base() {
        assert_eq!(TelegramConfig::default().api_base, "https://api.telegram.org");
    }
}
