//! Services module
//!
//! This module contains business logic services

pub mod announcements;
pub mod auth;
pub mod capabilities;
pub mod community;
pub mod events;
pub mod notification;
pub mod profiles;
pub mod realtime;
pub mod redis;
pub mod registration;

// Re-export commonly used services
pub use announcements::AnnouncementService;
pub use auth::{AuthResponse, AuthService, Claims};
pub use capabilities::{CapabilityResolver, Session};
pub use community::CommunityService;
pub use events::EventService;
pub use notification::{DeadLetter, NotificationService, NotificationStats};
pub use profiles::ProfileService;
pub use realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable};
pub use redis::{CacheEntry, RedisService};
pub use registration::{CsvExport, EventDetail, RegistrationService};

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub db: DatabaseService,
    pub feed: ChangeFeed,
    pub capabilities: CapabilityResolver,
    pub notifications: NotificationService,
    pub redis: Option<RedisService>,
    pub auth: AuthService,
    pub events: EventService,
    pub registrations: RegistrationService,
    pub announcements: AnnouncementService,
    pub community: CommunityService,
    pub profiles: ProfileService,
}

impl ServiceFactory {
    /// Build every service. Returns the email worker handle when email is enabled.
    pub fn new(settings: &Settings, db: DatabaseService) -> Result<(Self, Option<JoinHandle<()>>)> {
        let redis = if settings.redis.enabled {
            Some(RedisService::new(&settings.redis)?)
        } else {
            None
        };

        let (notifications, worker) = if settings.features.email_notifications {
            let (service, handle) = NotificationService::start(&settings.email)?;
            (service, Some(handle))
        } else {
            info!("Email notifications disabled");
            (NotificationService::disabled(&settings.email), None)
        };

        let feed = ChangeFeed::new(settings.realtime.channel_capacity);
        let capabilities = CapabilityResolver::new(
            db.roles.clone(),
            redis.clone(),
            Duration::from_secs(settings.redis.ttl_seconds),
        );

        let auth = AuthService::new(&db, capabilities.clone(), notifications.clone(), settings)?;
        let events = EventService::new(db.clone(), feed.clone());
        let registrations = RegistrationService::new(db.clone(), feed.clone(), notifications.clone());
        let announcements = AnnouncementService::new(db.clone(), feed.clone());
        let community = CommunityService::new(db.clone(), feed.clone());
        let profiles = ProfileService::new(db.clone(), capabilities.clone(), feed.clone());

        Ok((
            Self {
                db,
                feed,
                capabilities,
                notifications,
                redis,
                auth,
                events,
                registrations,
                announcements,
                community,
                profiles,
            },
            worker,
        ))
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = match self.db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        };
        let redis_healthy = match &self.redis {
            Some(redis) => Some(redis.health_check().await),
            None => None,
        };

        ServiceHealthStatus {
            database_healthy,
            redis_healthy,
            email_enabled: self.notifications.is_enabled(),
            realtime_subscribers: self.feed.subscriber_count(),
            notifications: self.notifications.stats(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    /// `None` when Redis is not configured
    pub redis_healthy: Option<bool>,
    pub email_enabled: bool,
    pub realtime_subscribers: usize,
    pub notifications: NotificationStats,
}

impl ServiceHealthStatus {
    /// Only the database is critical; Redis and email degrade gracefully
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if self.redis_healthy == Some(false) {
            issues.push("Redis connection failed".to_string());
        }
        if self.notifications.failed > 0 {
            issues.push(format!("{} email jobs failed", self.notifications.failed));
        }

        issues
    }
}
