//! Community discussion repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::DiscussionStore;
use crate::models::discussion::{Discussion, DiscussionReply, DiscussionStatus, DiscussionWithAuthor, LikeToggle};
use crate::utils::errors::EventHubError;

const DISCUSSION_COLUMNS: &str = "id, author_id, title, description, likes, status, created_at, updated_at";

#[derive(Clone)]
pub struct DiscussionRepository {
    pool: PgPool,
}

impl DiscussionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiscussionStore for DiscussionRepository {
    async fn create(&self, author_id: Uuid, title: String, description: String) -> Result<Discussion, EventHubError> {
        let now = Utc::now();
        let discussion = sqlx::query_as::<_, Discussion>(&format!(
            r#"
            INSERT INTO community_discussions (id, author_id, title, description, likes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, 'pending', $5, $6)
            RETURNING {DISCUSSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(title)
        .bind(description)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(discussion)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Discussion>, EventHubError> {
        let discussion = sqlx::query_as::<_, Discussion>(&format!(
            "SELECT {DISCUSSION_COLUMNS} FROM community_discussions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(discussion)
    }

    async fn list(&self, status: Option<DiscussionStatus>) -> Result<Vec<DiscussionWithAuthor>, EventHubError> {
        let discussions = sqlx::query_as::<_, DiscussionWithAuthor>(
            r#"
            SELECT d.id, d.author_id, d.title, d.description, d.likes, d.status, d.created_at, d.updated_at,
                   p.name AS author_name, p.year AS author_year
            FROM community_discussions d
            LEFT JOIN profiles p ON p.id = d.author_id
            WHERE $1::discussion_status IS NULL OR d.status = $1
            ORDER BY d.created_at DESC
            "#
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(discussions)
    }

    async fn set_status(&self, id: Uuid, status: DiscussionStatus) -> Result<Option<Discussion>, EventHubError> {
        let discussion = sqlx::query_as::<_, Discussion>(&format!(
            r#"
            UPDATE community_discussions SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING {DISCUSSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(discussion)
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<Option<LikeToggle>, EventHubError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM community_discussions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let unliked = sqlx::query("DELETE FROM discussion_likes WHERE discussion_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !unliked {
            sqlx::query(
                "INSERT INTO discussion_likes (id, discussion_id, user_id, created_at) VALUES ($1, $2, $3, $4)"
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        let discussion = sqlx::query_as::<_, Discussion>(&format!(
            r#"
            UPDATE community_discussions
            SET likes = (SELECT COUNT(*) FROM discussion_likes WHERE discussion_id = $1),
                updated_at = $2
            WHERE id = $1
            RETURNING {DISCUSSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(LikeToggle { discussion, liked: !unliked }))
    }

    async fn add_reply(&self, discussion_id: Uuid, author_id: Uuid, content: String) -> Result<DiscussionReply, EventHubError> {
        let reply = sqlx::query_as::<_, DiscussionReply>(
            r#"
            INSERT INTO discussion_replies (id, discussion_id, author_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, discussion_id, author_id, content, created_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(discussion_id)
        .bind(author_id)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(reply)
    }

    async fn replies(&self, discussion_id: Uuid) -> Result<Vec<DiscussionReply>, EventHubError> {
        let replies = sqlx::query_as::<_, DiscussionReply>(
            r#"
            SELECT id, discussion_id, author_id, content, created_at
            FROM discussion_replies
            WHERE discussion_id = $1
            ORDER BY created_at ASC
            "#
        )
        .bind(discussion_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(replies)
    }

    async fn count_by_status(&self, status: DiscussionStatus) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM community_discussions WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
