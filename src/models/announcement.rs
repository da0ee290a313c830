//! Announcement model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub event_id: Option<Uuid>,
    pub is_important: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form payload used for both creating and editing an announcement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnouncementInput {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub event_id: Option<Uuid>,
    #[serde(default)]
    pub is_important: bool,
}

/// Validated announcement fields ready for the store
#[derive(Debug, Clone)]
pub struct AnnouncementDraft {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub event_id: Option<Uuid>,
    pub is_important: bool,
    pub created_by: Uuid,
}

/// Related-event option shown in the announcement form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventOption {
    pub id: Uuid,
    pub title: String,
}
