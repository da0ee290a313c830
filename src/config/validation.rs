//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_auth_config(&settings.auth, settings.features.oauth)?;
    if settings.features.email_notifications {
        validate_email_config(&settings.email)?;
    }
    validate_realtime_config(&settings.realtime)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(EventHubError::Config(
            "Server port must be greater than 0".to_string()
        ));
    }

    url::Url::parse(&config.site_url).map_err(|e| {
        EventHubError::Config(format!("Invalid site URL {}: {}", config.site_url, e))
    })?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(EventHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EventHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.enabled && config.url.is_empty() {
        return Err(EventHubError::Config(
            "Redis URL is required when Redis is enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate session and OAuth configuration
fn validate_auth_config(config: &super::AuthConfig, oauth_enabled: bool) -> Result<()> {
    if config.jwt_secret.len() < 32 {
        return Err(EventHubError::Config(
            "JWT secret must be at least 32 characters".to_string()
        ));
    }

    if config.session_ttl_hours <= 0 {
        return Err(EventHubError::Config(
            "Session TTL must be greater than 0".to_string()
        ));
    }

    if config.reset_token_ttl_minutes <= 0 {
        return Err(EventHubError::Config(
            "Password reset token TTL must be greater than 0".to_string()
        ));
    }

    if oauth_enabled {
        if config.oauth.is_empty() {
            return Err(EventHubError::Config(
                "OAuth is enabled but no providers are configured".to_string()
            ));
        }

        for (name, provider) in &config.oauth {
            if provider.client_id.is_empty() || provider.client_secret.is_empty() {
                return Err(EventHubError::Config(
                    format!("OAuth provider {} is missing client credentials", name)
                ));
            }
            for endpoint in [&provider.authorize_url, &provider.token_url, &provider.userinfo_url] {
                url::Url::parse(endpoint).map_err(|e| {
                    EventHubError::Config(format!("OAuth provider {} has invalid URL {}: {}", name, endpoint, e))
                })?;
            }
        }
    }

    Ok(())
}

/// Validate email provider configuration
fn validate_email_config(config: &super::EmailConfig) -> Result<()> {
    if config.api_key.is_empty() {
        return Err(EventHubError::Config(
            "Email API key is required when email notifications are enabled".to_string()
        ));
    }

    url::Url::parse(&config.api_url).map_err(|e| {
        EventHubError::Config(format!("Invalid email API URL {}: {}", config.api_url, e))
    })?;

    if config.max_attempts == 0 {
        return Err(EventHubError::Config(
            "Email max attempts must be greater than 0".to_string()
        ));
    }

    if config.queue_capacity == 0 {
        return Err(EventHubError::Config(
            "Email queue capacity must be greater than 0".to_string()
        ));
    }

    if config.dead_letter_capacity == 0 {
        return Err(EventHubError::Config(
            "Email dead-letter capacity must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate change feed configuration
fn validate_realtime_config(config: &super::RealtimeConfig) -> Result<()> {
    if config.channel_capacity == 0 {
        return Err(EventHubError::Config(
            "Realtime channel capacity must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitConfig) -> Result<()> {
    if config.auth_requests_per_minute == 0 {
        return Err(EventHubError::Config(
            "Auth requests per minute must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
