//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub realtime: RealtimeConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public URL of the web client, used to build links in emails and OAuth redirects
    pub site_url: String,
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Session and account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
    #[serde(default)]
    pub oauth: HashMap<String, OAuthProviderConfig>,
}

/// A single OAuth2 authorization-code provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
    /// Callback registered with the provider; defaults to the server's own callback route
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Transactional email provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
    pub app_name: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    pub queue_capacity: usize,
    /// Failed jobs kept for operators; the oldest is dropped past this
    pub dead_letter_capacity: usize,
}

/// Change feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
    pub channel_capacity: usize,
    pub keep_alive_seconds: u64,
}

/// Rate limits for credential endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub auth_requests_per_minute: u32,
    pub auth_burst: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub email_notifications: bool,
    pub realtime: bool,
    pub oauth: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    ///
    /// Defaults come first, then `config.toml` (optional), then `EVENTHUB__SECTION__KEY`
    /// environment variables.
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("EVENTHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EventHubError> {
        super::validation::validate_settings(self)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                site_url: "http://localhost:5173".to_string(),
                cors_origins: vec!["http://localhost:5173".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/eventhub".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                enabled: false,
                url: "redis://localhost:6379".to_string(),
                prefix: "eventhub:".to_string(),
                ttl_seconds: 900,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                session_ttl_hours: 24 * 7,
                reset_token_ttl_minutes: 60,
                oauth: HashMap::new(),
            },
            email: EmailConfig {
                api_url: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from_address: "PESCOE Event Hub <onboarding@resend.dev>".to_string(),
                app_name: "PESCOE Event Hub".to_string(),
                timeout_seconds: 10,
                max_attempts: 3,
                retry_base_ms: 500,
                queue_capacity: 256,
                dead_letter_capacity: 500,
            },
            realtime: RealtimeConfig {
                channel_capacity: 1024,
                keep_alive_seconds: 15,
            },
            rate_limit: RateLimitConfig {
                auth_requests_per_minute: 10,
                auth_burst: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                json: false,
            },
            features: FeaturesConfig {
                email_notifications: true,
                realtime: true,
                oauth: false,
            },
        }
    }
}
