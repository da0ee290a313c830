//! Announcement board

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::*;
use crate::services::capabilities::Session;
use crate::services::realtime::{ChangeFeed, ChangeTable};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{optional_text, require_text};
use crate::utils::logging::log_admin_action;

#[derive(Clone)]
pub struct AnnouncementService {
    db: DatabaseService,
    feed: ChangeFeed,
}

impl AnnouncementService {
    pub fn new(db: DatabaseService, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// Newest first, visible to everyone
    pub async fn list(&self) -> Result<Vec<Announcement>> {
        self.db.announcements.list().await
    }

    /// Announcements posted after the viewer last looked
    pub async fn unread_count(&self, since: Option<DateTime<Utc>>) -> Result<i64> {
        self.db.announcements.count_since(since).await
    }

    pub async fn event_options(&self, session: &Session) -> Result<Vec<EventOption>> {
        session.require_admin()?;
        self.db.events.open_event_options().await
    }

    pub async fn create(&self, session: &Session, input: AnnouncementInput) -> Result<Announcement> {
        session.require_admin()?;
        let draft = self.validate(session, input).await?;

        let announcement = self.db.announcements.create(draft).await?;

        log_admin_action(session.user_id, "create_announcement", Some(&announcement.id.to_string()), None);
        self.feed.inserted(ChangeTable::Announcements, announcement.id, &announcement);
        Ok(announcement)
    }

    pub async fn update(&self, session: &Session, announcement_id: Uuid, input: AnnouncementInput) -> Result<Announcement> {
        session.require_admin()?;
        let draft = self.validate(session, input).await?;

        let announcement = self
            .db
            .announcements
            .update(announcement_id, draft)
            .await?
            .ok_or(EventHubError::AnnouncementNotFound { announcement_id })?;

        log_admin_action(session.user_id, "update_announcement", Some(&announcement_id.to_string()), None);
        self.feed.updated(ChangeTable::Announcements, announcement_id, &announcement);
        Ok(announcement)
    }

    pub async fn delete(&self, session: &Session, announcement_id: Uuid) -> Result<()> {
        session.require_admin()?;
        if !self.db.announcements.delete(announcement_id).await? {
            return Err(EventHubError::AnnouncementNotFound { announcement_id });
        }

        log_admin_action(session.user_id, "delete_announcement", Some(&announcement_id.to_string()), None);
        self.feed.deleted(ChangeTable::Announcements, announcement_id);
        Ok(())
    }

    async fn validate(&self, session: &Session, input: AnnouncementInput) -> Result<AnnouncementDraft> {
        let link = optional_text(input.link.as_deref());
        if let Some(link) = &link {
            validate_link(link)?;
        }

        if let Some(event_id) = input.event_id {
            if self.db.events.find_by_id(event_id).await?.is_none() {
                return Err(EventHubError::EventNotFound { event_id });
            }
        }

        Ok(AnnouncementDraft {
            title: require_text(&input.title, "Title")?,
            message: require_text(&input.message, "Message")?,
            link,
            event_id: input.event_id,
            is_important: input.is_important,
            created_by: session.user_id,
        })
    }
}

/// Links must be absolute http(s) URLs
pub fn validate_link(link: &str) -> Result<()> {
    let parsed = Url::parse(link)
        .map_err(|_| EventHubError::InvalidInput("Link must be a valid URL".to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(EventHubError::InvalidInput(
            "Link must start with http:// or https://".to_string(),
        )),
    }
}
