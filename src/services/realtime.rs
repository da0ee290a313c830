//! Row-level change feed
//!
//! Every service mutation publishes a [`ChangeEvent`]. Subscribers receive
//! events from the moment they subscribe; there is no replay. A subscriber that
//! falls behind the channel capacity is told how many events it missed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::services::capabilities::Session;
use crate::utils::errors::EventHubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Events,
    EventRegistrations,
    Announcements,
    CommunityDiscussions,
    DiscussionReplies,
    UserRoles,
}

impl ChangeTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::Events => "events",
            ChangeTable::EventRegistrations => "event_registrations",
            ChangeTable::Announcements => "announcements",
            ChangeTable::CommunityDiscussions => "community_discussions",
            ChangeTable::DiscussionReplies => "discussion_replies",
            ChangeTable::UserRoles => "user_roles",
        }
    }
}

impl fmt::Display for ChangeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeTable {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "events" => Ok(ChangeTable::Events),
            "event_registrations" => Ok(ChangeTable::EventRegistrations),
            "announcements" => Ok(ChangeTable::Announcements),
            "community_discussions" => Ok(ChangeTable::CommunityDiscussions),
            "discussion_replies" => Ok(ChangeTable::DiscussionReplies),
            "user_roles" => Ok(ChangeTable::UserRoles),
            other => Err(EventHubError::InvalidInput(format!("Unknown table: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change. `row` carries the new row for inserts and updates,
/// and the removed row for registration deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub id: Uuid,
    pub row: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Admins see everything. Everyone else never sees role grants, and sees
    /// registration changes only for rows they own.
    pub fn visible_to(&self, session: &Session) -> bool {
        if session.is_admin() {
            return true;
        }
        match self.table {
            ChangeTable::UserRoles => false,
            ChangeTable::EventRegistrations => self.row_owner() == Some(session.user_id),
            _ => true,
        }
    }

    fn row_owner(&self) -> Option<Uuid> {
        self.row.as_ref()?.get("user_id")?.as_str()?.parse().ok()
    }
}

/// Process-wide broadcast of change events
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish a change. Having no subscribers is normal and not an error.
    pub fn publish<T: Serialize>(&self, table: ChangeTable, kind: ChangeKind, id: Uuid, row: Option<&T>) {
        let row = row.and_then(|r| serde_json::to_value(r).ok());
        let event = ChangeEvent {
            table,
            kind,
            id,
            row,
            at: Utc::now(),
        };
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(table = %table, id = %id, delivered, "Change published");
    }

    pub fn inserted<T: Serialize>(&self, table: ChangeTable, id: Uuid, row: &T) {
        self.publish(table, ChangeKind::Insert, id, Some(row));
    }

    pub fn updated<T: Serialize>(&self, table: ChangeTable, id: Uuid, row: &T) {
        self.publish(table, ChangeKind::Update, id, Some(row));
    }

    pub fn deleted(&self, table: ChangeTable, id: Uuid) {
        self.publish::<()>(table, ChangeKind::Delete, id, None);
    }

    /// Delete that carries the removed row, for tables filtered per subscriber
    pub fn removed<T: Serialize>(&self, table: ChangeTable, id: Uuid, row: &T) {
        self.publish(table, ChangeKind::Delete, id, Some(row));
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppRole;

    #[tokio::test]
    async fn test_subscriber_receives_published_change() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        let id = Uuid::new_v4();

        feed.updated(ChangeTable::Events, id, &serde_json::json!({"current_attendees": 3}));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, ChangeTable::Events);
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.id, id);
        assert_eq!(event.row.unwrap()["current_attendees"], 3);
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscribers() {
        let feed = ChangeFeed::new(8);
        feed.deleted(ChangeTable::Announcements, Uuid::new_v4());

        let mut rx = feed.subscribe();
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_is_told_how_many_were_missed() {
        let feed = ChangeFeed::new(2);
        let mut rx = feed.subscribe();
        for _ in 0..5 {
            feed.deleted(ChangeTable::Events, Uuid::new_v4());
        }
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(3))));
    }

    fn session(admin: bool) -> Session {
        let mut capabilities = std::collections::BTreeSet::from([AppRole::Student]);
        if admin {
            capabilities.insert(AppRole::Admin);
        }
        Session {
            user_id: Uuid::new_v4(),
            email: "viewer@college.edu".to_string(),
            capabilities,
        }
    }

    fn change(table: ChangeTable, row: Option<serde_json::Value>) -> ChangeEvent {
        ChangeEvent {
            table,
            kind: ChangeKind::Insert,
            id: Uuid::new_v4(),
            row,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_visibility_per_session() {
        let student = session(false);
        let admin = session(true);
        let own = serde_json::json!({ "user_id": student.user_id, "event_id": Uuid::new_v4() });
        let other = serde_json::json!({ "user_id": Uuid::new_v4(), "event_id": Uuid::new_v4() });
        let grant = serde_json::json!({ "user_id": student.user_id, "role": "admin" });

        assert!(change(ChangeTable::EventRegistrations, Some(own)).visible_to(&student));
        assert!(!change(ChangeTable::EventRegistrations, Some(other.clone())).visible_to(&student));
        assert!(!change(ChangeTable::EventRegistrations, None).visible_to(&student));
        assert!(!change(ChangeTable::UserRoles, Some(grant.clone())).visible_to(&student));
        assert!(change(ChangeTable::Events, None).visible_to(&student));

        assert!(change(ChangeTable::EventRegistrations, Some(other)).visible_to(&admin));
        assert!(change(ChangeTable::UserRoles, Some(grant)).visible_to(&admin));
    }

    #[test]
    fn test_table_names_parse() {
        assert_eq!("event_registrations".parse::<ChangeTable>().unwrap(), ChangeTable::EventRegistrations);
        assert!("profiles".parse::<ChangeTable>().is_err());
    }
}
