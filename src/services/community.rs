//! Community board: student proposals, likes, replies and moderation

use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::*;
use crate::services::capabilities::Session;
use crate::services::realtime::{ChangeFeed, ChangeTable};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::require_length;
use crate::utils::logging::{log_admin_action, log_user_action};

pub const TITLE_LENGTH: (usize, usize) = (5, 200);
pub const DESCRIPTION_LENGTH: (usize, usize) = (10, 5000);
pub const REPLY_LENGTH: (usize, usize) = (1, 2000);

#[derive(Clone)]
pub struct CommunityService {
    db: DatabaseService,
    feed: ChangeFeed,
}

impl CommunityService {
    pub fn new(db: DatabaseService, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub async fn list(&self, status: Option<DiscussionStatus>) -> Result<Vec<DiscussionWithAuthor>> {
        self.db.discussions.list(status).await
    }

    pub async fn create(&self, session: &Session, request: CreateDiscussionRequest) -> Result<Discussion> {
        let title = require_length(&request.title, "Title", TITLE_LENGTH.0, TITLE_LENGTH.1)?;
        let description = require_length(
            &request.description,
            "Description",
            DESCRIPTION_LENGTH.0,
            DESCRIPTION_LENGTH.1,
        )?;

        let discussion = self.db.discussions.create(session.user_id, title, description).await?;

        log_user_action(session.user_id, "create_discussion", Some(&discussion.id.to_string()));
        self.feed.inserted(ChangeTable::CommunityDiscussions, discussion.id, &discussion);
        Ok(discussion)
    }

    /// Like if not yet liked by the caller, otherwise unlike
    pub async fn toggle_like(&self, session: &Session, discussion_id: Uuid) -> Result<LikeOutcome> {
        let toggle = self
            .db
            .discussions
            .toggle_like(discussion_id, session.user_id)
            .await?
            .ok_or(EventHubError::DiscussionNotFound { discussion_id })?;

        self.feed.updated(ChangeTable::CommunityDiscussions, discussion_id, &toggle.discussion);
        Ok(toggle.outcome())
    }

    pub async fn replies(&self, discussion_id: Uuid) -> Result<Vec<DiscussionReply>> {
        self.require_discussion(discussion_id).await?;
        self.db.discussions.replies(discussion_id).await
    }

    pub async fn reply(&self, session: &Session, discussion_id: Uuid, request: CreateReplyRequest) -> Result<DiscussionReply> {
        let content = require_length(&request.content, "Reply", REPLY_LENGTH.0, REPLY_LENGTH.1)?;
        self.require_discussion(discussion_id).await?;

        let reply = self.db.discussions.add_reply(discussion_id, session.user_id, content).await?;

        log_user_action(session.user_id, "reply", Some(&discussion_id.to_string()));
        self.feed.inserted(ChangeTable::DiscussionReplies, reply.id, &reply);
        Ok(reply)
    }

    /// Moderation: any status may be set from any other
    pub async fn set_status(&self, session: &Session, discussion_id: Uuid, status: DiscussionStatus) -> Result<Discussion> {
        session.require_admin()?;
        let discussion = self
            .db
            .discussions
            .set_status(discussion_id, status)
            .await?
            .ok_or(EventHubError::DiscussionNotFound { discussion_id })?;

        log_admin_action(
            session.user_id,
            "set_discussion_status",
            Some(&discussion_id.to_string()),
            Some(status.as_str()),
        );
        self.feed.updated(ChangeTable::CommunityDiscussions, discussion_id, &discussion);
        Ok(discussion)
    }

    /// Admin listing with optional status filter
    pub async fn moderation_queue(&self, session: &Session, status: Option<DiscussionStatus>) -> Result<Vec<DiscussionWithAuthor>> {
        session.require_admin()?;
        self.list(status).await
    }

    async fn require_discussion(&self, discussion_id: Uuid) -> Result<Discussion> {
        self.db
            .discussions
            .find_by_id(discussion_id)
            .await?
            .ok_or(EventHubError::DiscussionNotFound { discussion_id })
    }
}
