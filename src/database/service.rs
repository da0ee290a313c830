//! Database service layer
//!
//! Bundles one handle per storage trait, backed either by Postgres or by a shared
//! [`MemoryStore`].

use std::sync::Arc;

use crate::database::memory::MemoryStore;
use crate::database::repositories::*;
use crate::database::store::*;
use crate::database::{health_check, DatabasePool};
use crate::models::{AdminAnalytics, DiscussionStatus, EventStatus};
use crate::utils::errors::EventHubError;

#[derive(Clone)]
pub struct DatabaseService {
    pub events: Arc<dyn EventStore>,
    pub registrations: Arc<dyn RegistrationStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub roles: Arc<dyn RoleStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub announcements: Arc<dyn AnnouncementStore>,
    pub discussions: Arc<dyn DiscussionStore>,
    pool: Option<DatabasePool>,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: Arc::new(EventRepository::new(pool.clone())),
            registrations: Arc::new(RegistrationRepository::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            roles: Arc::new(RoleRepository::new(pool.clone())),
            accounts: Arc::new(AccountRepository::new(pool.clone())),
            announcements: Arc::new(AnnouncementRepository::new(pool.clone())),
            discussions: Arc::new(DiscussionRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// All stores backed by one in-memory state
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            events: store.clone(),
            registrations: store.clone(),
            profiles: store.clone(),
            roles: store.clone(),
            accounts: store.clone(),
            announcements: store.clone(),
            discussions: store,
            pool: None,
        }
    }

    pub fn pool(&self) -> Option<&DatabasePool> {
        self.pool.as_ref()
    }

    /// Check database health; the in-memory backend is always healthy
    pub async fn health_check(&self) -> Result<(), EventHubError> {
        match &self.pool {
            Some(pool) => health_check(pool).await,
            None => Ok(()),
        }
    }

    /// Headline numbers for the admin dashboard
    pub async fn analytics(&self) -> Result<AdminAnalytics, EventHubError> {
        let (upcoming_events, total_registrations, pending_discussions, total_users) = tokio::try_join!(
            self.events.count_by_status(EventStatus::Upcoming),
            self.registrations.count(),
            self.discussions.count_by_status(DiscussionStatus::Pending),
            self.profiles.count(),
        )?;

        Ok(AdminAnalytics {
            upcoming_events,
            total_registrations,
            pending_discussions,
            total_users,
        })
    }
}
