//! Community discussion (event proposal) model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::EventHubError;

/// Moderation status. No transition graph: any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discussion_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    Pending,
    UnderReview,
    Accepted,
    Rejected,
}

impl DiscussionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionStatus::Pending => "pending",
            DiscussionStatus::UnderReview => "under_review",
            DiscussionStatus::Accepted => "accepted",
            DiscussionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DiscussionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscussionStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(DiscussionStatus::Pending),
            "under_review" => Ok(DiscussionStatus::UnderReview),
            "accepted" => Ok(DiscussionStatus::Accepted),
            "rejected" => Ok(DiscussionStatus::Rejected),
            other => Err(EventHubError::InvalidInput(format!("Unknown discussion status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Discussion {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub likes: i32,
    pub status: DiscussionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row: a discussion with its author's display fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscussionWithAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub discussion: Discussion,
    pub author_name: Option<String>,
    pub author_year: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDiscussionRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DiscussionReply {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReplyRequest {
    pub content: String,
}

/// State after toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i32,
}

/// Store result of a like toggle: the updated discussion row and whether the
/// caller now likes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeToggle {
    pub discussion: Discussion,
    pub liked: bool,
}

impl LikeToggle {
    pub fn outcome(&self) -> LikeOutcome {
        LikeOutcome {
            liked: self.liked,
            likes: self.discussion.likes,
        }
    }
}
