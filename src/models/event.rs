//! Event model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::EventHubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category")]
pub enum EventCategory {
    Technical,
    Competition,
    Workshop,
    Cultural,
    #[serde(rename = "Industrial Visit")]
    #[sqlx(rename = "Industrial Visit")]
    IndustrialVisit,
}

impl EventCategory {
    pub const ALL: [EventCategory; 5] = [
        EventCategory::Technical,
        EventCategory::Competition,
        EventCategory::Workshop,
        EventCategory::Cultural,
        EventCategory::IndustrialVisit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Technical => "Technical",
            EventCategory::Competition => "Competition",
            EventCategory::Workshop => "Workshop",
            EventCategory::Cultural => "Cultural",
            EventCategory::IndustrialVisit => "Industrial Visit",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EventHubError::InvalidInput(format!("Unknown event category: {}", s)))
    }
}

/// Lifecycle label of an event. Any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

impl EventStatus {
    /// Completed and cancelled events never accept registrations
    pub fn is_closed(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Live => "live",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub category: EventCategory,
    pub status: EventStatus,
    pub current_attendees: i32,
    pub max_attendees: i32,
    pub featured: bool,
    pub registration_open: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.current_attendees >= self.max_attendees
    }

    /// Whether new registrations are accepted, ignoring capacity
    pub fn accepts_registrations(&self) -> bool {
        self.registration_open && !self.status.is_closed()
    }

    pub fn remaining_capacity(&self) -> i32 {
        (self.max_attendees - self.current_attendees).max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub category: EventCategory,
    pub max_attendees: i32,
    pub status: Option<EventStatus>,
    pub featured: Option<bool>,
    pub registration_open: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub category: Option<EventCategory>,
    pub max_attendees: Option<i32>,
    pub status: Option<EventStatus>,
    pub featured: Option<bool>,
    pub registration_open: Option<bool>,
}

/// Catalog listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub search: Option<String>,
    /// `all` or blank means every category
    #[serde(default, deserialize_with = "deserialize_category_filter")]
    pub category: Option<EventCategory>,
}

fn deserialize_category_filter<'de, D>(deserializer: D) -> Result<Option<EventCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl EventFilter {
    /// Whether an event matches this filter (case-insensitive search on title and description)
    pub fn matches(&self, event: &Event) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => {
                let query = query.to_lowercase();
                event.title.to_lowercase().contains(&query)
                    || event.description.to_lowercase().contains(&query)
            }
            _ => true,
        };
        let matches_category = self.category.map_or(true, |c| c == event.category);
        matches_search && matches_category
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: EventCategory,
    pub count: i64,
}
