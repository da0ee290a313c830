//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the EventHub application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;
use crate::config::LoggingConfig;
use crate::utils::errors::{EventHubError, Result};

/// Initialize logging based on configuration
///
/// The returned guard must be held for the lifetime of the process, otherwise
/// buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| EventHubError::Config(format!("Invalid log filter {}: {}", config.level, e)))?;

    let (file_layer, guard) = match &config.file_path {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "eventhub.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let json_layer = config.json.then(|| fmt::layer().json().with_writer(std::io::stdout));
    let plain_layer = (!config.json).then(|| fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EventHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log user actions with structured data
pub fn log_user_action(user_id: Uuid, action: &str, details: Option<&str>) {
    info!(
        user_id = %user_id,
        action = action,
        details = details,
        "User action performed"
    );
}

/// Log event management actions
pub fn log_event_action(event_id: Uuid, action: &str, user_id: Uuid, details: Option<&str>) {
    info!(
        event_id = %event_id,
        action = action,
        user_id = %user_id,
        details = details,
        "Event action performed"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: Uuid, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = %admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
