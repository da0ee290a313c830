//! Announcement repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::AnnouncementStore;
use crate::models::announcement::{Announcement, AnnouncementDraft};
use crate::utils::errors::EventHubError;

const ANNOUNCEMENT_COLUMNS: &str = "id, title, message, link, event_id, is_important, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct AnnouncementRepository {
    pool: PgPool,
}

impl AnnouncementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnnouncementStore for AnnouncementRepository {
    async fn create(&self, draft: AnnouncementDraft) -> Result<Announcement, EventHubError> {
        let now = Utc::now();
        let announcement = sqlx::query_as::<_, Announcement>(&format!(
            r#"
            INSERT INTO announcements (id, title, message, link, event_id, is_important, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(draft.title)
        .bind(draft.message)
        .bind(draft.link)
        .bind(draft.event_id)
        .bind(draft.is_important)
        .bind(draft.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(announcement)
    }

    /// Replace the editable fields; the original author is kept
    async fn update(&self, id: Uuid, draft: AnnouncementDraft) -> Result<Option<Announcement>, EventHubError> {
        let announcement = sqlx::query_as::<_, Announcement>(&format!(
            r#"
            UPDATE announcements
            SET title = $2, message = $3, link = $4, event_id = $5, is_important = $6, updated_at = $7
            WHERE id = $1
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(draft.title)
        .bind(draft.message)
        .bind(draft.link)
        .bind(draft.event_id)
        .bind(draft.is_important)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(announcement)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, EventHubError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Announcement>, EventHubError> {
        let announcements = sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(announcements)
    }

    async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM announcements WHERE $1::timestamptz IS NULL OR created_at > $1"
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
