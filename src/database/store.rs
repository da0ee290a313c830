//! Storage traits
//!
//! Each trait is one table family. The Postgres repositories implement them for
//! production, [`MemoryStore`](super::memory::MemoryStore) implements all of them
//! for tests and local runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::*;
use crate::utils::errors::Result;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, created_by: Uuid, request: CreateEventRequest) -> Result<Event>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// Apply a partial update. Returns `None` when the event is missing or the new
    /// capacity would fall below the current attendee count.
    async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Option<Event>>;

    /// Delete an event with its registrations. Returns the removed
    /// registrations, or `None` when the event does not exist.
    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Registration>>>;

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Featured events that are upcoming or live
    async fn featured(&self) -> Result<Vec<Event>>;

    /// Event count for every category, zero-filled
    async fn category_counts(&self) -> Result<Vec<CategoryCount>>;

    /// Upcoming and live events, for the announcement form
    async fn open_event_options(&self) -> Result<Vec<EventOption>>;

    async fn count_by_status(&self, status: EventStatus) -> Result<i64>;
}

/// Registration ledger plus the capacity counter it drives.
///
/// `register` and `unregister` run the ledger write and the counter adjustment
/// as one atomic unit.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn register(&self, user_id: Uuid, event_id: Uuid) -> Result<RegistrationOutcome>;

    async fn unregister(&self, user_id: Uuid, event_id: Uuid) -> Result<UnregistrationOutcome>;

    async fn is_registered(&self, user_id: Uuid, event_id: Uuid) -> Result<bool>;

    async fn roster(&self, event_id: Uuid) -> Result<Vec<RosterEntry>>;

    async fn set_attended(&self, registration_id: Uuid, attended: bool) -> Result<Option<Registration>>;

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<UserRegistration>>;

    async fn count(&self) -> Result<i64>;

    /// Recompute `current_attendees` from the ledger
    async fn recount(&self, event_id: Uuid) -> Result<Option<Event>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>>;

    async fn update(&self, id: Uuid, request: UpdateProfileRequest) -> Result<Option<Profile>>;

    async fn list_with_roles(&self) -> Result<Vec<UserWithRoles>>;

    async fn count(&self) -> Result<i64>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<AppRole>>;

    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool>;

    /// Returns `true` when a new grant was inserted
    async fn grant(&self, user_id: Uuid, role: AppRole) -> Result<bool>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create account, profile and `student` role together.
    /// A duplicate email is reported as `InvalidInput`.
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;

    async fn create_reset_token(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken>;

    /// Mark a usable token as used and return its account
    async fn consume_reset_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Uuid>>;
}

#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn create(&self, draft: AnnouncementDraft) -> Result<Announcement>;

    async fn update(&self, id: Uuid, draft: AnnouncementDraft) -> Result<Option<Announcement>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Newest first
    async fn list(&self) -> Result<Vec<Announcement>>;

    async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<i64>;
}

#[async_trait]
pub trait DiscussionStore: Send + Sync {
    async fn create(&self, author_id: Uuid, title: String, description: String) -> Result<Discussion>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Discussion>>;

    /// Newest first, optionally restricted to one status
    async fn list(&self, status: Option<DiscussionStatus>) -> Result<Vec<DiscussionWithAuthor>>;

    async fn set_status(&self, id: Uuid, status: DiscussionStatus) -> Result<Option<Discussion>>;

    /// Like or unlike; `None` when the discussion does not exist
    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<Option<LikeToggle>>;

    async fn add_reply(&self, discussion_id: Uuid, author_id: Uuid, content: String) -> Result<DiscussionReply>;

    /// Oldest first
    async fn replies(&self, discussion_id: Uuid) -> Result<Vec<DiscussionReply>>;

    async fn count_by_status(&self, status: DiscussionStatus) -> Result<i64>;
}
