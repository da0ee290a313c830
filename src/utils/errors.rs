//! Error handling for EventHub
//!
//! This module defines the main error type used throughout the application
//! and the mapping of that error onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for EventHub
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("Profile not found: {user_id}")]
    ProfileNotFound { user_id: Uuid },

    #[error("Announcement not found: {announcement_id}")]
    AnnouncementNotFound { announcement_id: Uuid },

    #[error("Discussion not found: {discussion_id}")]
    DiscussionNotFound { discussion_id: Uuid },

    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("Event Full")]
    EventFull { event_id: Uuid },

    #[error("Registration is closed for this event")]
    RegistrationClosed { event_id: Uuid },

    #[error("You are already registered for this event")]
    AlreadyRegistered { event_id: Uuid },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

impl EventHubError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::Database(_) => false,
            EventHubError::Migration(_) => false,
            EventHubError::Redis(_) => true,
            EventHubError::Http(_) => true,
            EventHubError::Serialization(_) => false,
            EventHubError::Io(_) => true,
            EventHubError::UrlParse(_) => false,
            EventHubError::Token(_) => false,
            EventHubError::Config(_) => false,
            EventHubError::Unauthenticated => false,
            EventHubError::Authentication(_) => false,
            EventHubError::PermissionDenied(_) => false,
            EventHubError::EventNotFound { .. } => false,
            EventHubError::ProfileNotFound { .. } => false,
            EventHubError::AnnouncementNotFound { .. } => false,
            EventHubError::DiscussionNotFound { .. } => false,
            EventHubError::RegistrationNotFound => false,
            EventHubError::EventFull { .. } => false,
            EventHubError::RegistrationClosed { .. } => false,
            EventHubError::AlreadyRegistered { .. } => false,
            EventHubError::RateLimitExceeded => true,
            EventHubError::InvalidInput(_) => false,
            EventHubError::PasswordHash(_) => false,
            EventHubError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Database(_) => ErrorSeverity::Critical,
            EventHubError::Migration(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::Unauthenticated => ErrorSeverity::Info,
            EventHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            EventHubError::Authentication(_) => ErrorSeverity::Warning,
            EventHubError::RateLimitExceeded => ErrorSeverity::Warning,
            EventHubError::InvalidInput(_)
            | EventHubError::EventFull { .. }
            | EventHubError::RegistrationClosed { .. }
            | EventHubError::AlreadyRegistered { .. }
            | EventHubError::RegistrationNotFound
            | EventHubError::EventNotFound { .. }
            | EventHubError::ProfileNotFound { .. }
            | EventHubError::AnnouncementNotFound { .. }
            | EventHubError::DiscussionNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventHubError::Unauthenticated | EventHubError::Authentication(_) | EventHubError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            EventHubError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            EventHubError::EventNotFound { .. }
            | EventHubError::ProfileNotFound { .. }
            | EventHubError::AnnouncementNotFound { .. }
            | EventHubError::DiscussionNotFound { .. }
            | EventHubError::RegistrationNotFound => StatusCode::NOT_FOUND,
            EventHubError::EventFull { .. }
            | EventHubError::RegistrationClosed { .. }
            | EventHubError::AlreadyRegistered { .. } => StatusCode::CONFLICT,
            EventHubError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EventHubError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            EventHubError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the end user
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Something went wrong. Please try again.".to_string(),
            StatusCode::UNAUTHORIZED if matches!(self, EventHubError::Token(_)) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for EventHubError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error = %self,
                    status = status.as_u16(),
                    recoverable = self.is_recoverable(),
                    "Request failed"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
            }
            ErrorSeverity::Info => {
                tracing::debug!(error = %self, status = status.as_u16(), "Request refused");
            }
        }

        let body = serde_json::json!({
            "error": self.public_message(),
            "severity": self.severity().to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_conflicts_map_to_409() {
        let id = Uuid::new_v4();
        assert_eq!(EventHubError::EventFull { event_id: id }.status_code(), StatusCode::CONFLICT);
        assert_eq!(EventHubError::AlreadyRegistered { event_id: id }.status_code(), StatusCode::CONFLICT);
        assert_eq!(EventHubError::EventFull { event_id: id }.to_string(), "Event Full");
    }

    #[test]
    fn test_store_failures_hide_details() {
        let err = EventHubError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("RowNotFound"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = EventHubError::InvalidInput("Title must be at least 5 characters".to_string());
        assert_eq!(err.public_message(), "Title must be at least 5 characters");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
