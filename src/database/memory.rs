//! In-memory storage backend
//!
//! Implements every storage trait over one mutex-guarded state, so each call is
//! atomic the way a single Postgres transaction is. Used by tests and by local
//! runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::*;
use crate::models::*;
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    profiles: HashMap<Uuid, Profile>,
    roles: Vec<RoleGrant>,
    reset_tokens: Vec<PasswordResetToken>,
    events: HashMap<Uuid, Event>,
    registrations: Vec<Registration>,
    announcements: Vec<Announcement>,
    discussions: HashMap<Uuid, Discussion>,
    likes: Vec<(Uuid, Uuid)>,
    replies: Vec<DiscussionReply>,
}

impl MemoryState {
    fn event(&self, event_id: Uuid) -> Result<&Event> {
        self.events
            .get(&event_id)
            .ok_or(EventHubError::EventNotFound { event_id })
    }

    fn event_mut(&mut self, event_id: Uuid) -> Result<&mut Event> {
        self.events
            .get_mut(&event_id)
            .ok_or(EventHubError::EventNotFound { event_id })
    }

    fn is_registered(&self, user_id: Uuid, event_id: Uuid) -> bool {
        self.registrations
            .iter()
            .any(|r| r.user_id == user_id && r.event_id == event_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an event's attendee counter without touching the ledger.
    /// Lets tests reproduce drift that `recount` repairs.
    pub async fn force_attendee_count(&self, event_id: Uuid, count: i32) -> Result<()> {
        let mut state = self.state.lock().await;
        state.event_mut(event_id)?.current_attendees = count;
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create(&self, created_by: Uuid, request: CreateEventRequest) -> Result<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            date: request.date,
            time: request.time,
            location: request.location,
            category: request.category,
            status: request.status.unwrap_or(EventStatus::Upcoming),
            current_attendees: 0,
            max_attendees: request.max_attendees,
            featured: request.featured.unwrap_or(false),
            registration_open: request.registration_open.unwrap_or(true),
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Option<Event>> {
        let mut state = self.state.lock().await;
        let Some(event) = state.events.get_mut(&id) else {
            return Ok(None);
        };
        if request.max_attendees.map_or(false, |max| max < event.current_attendees) {
            return Ok(None);
        }

        if let Some(title) = request.title {
            event.title = title;
        }
        if let Some(description) = request.description {
            event.description = description;
        }
        if let Some(date) = request.date {
            event.date = date;
        }
        if let Some(time) = request.time {
            event.time = time;
        }
        if let Some(location) = request.location {
            event.location = location;
        }
        if let Some(category) = request.category {
            event.category = category;
        }
        if let Some(max_attendees) = request.max_attendees {
            event.max_attendees = max_attendees;
        }
        if let Some(status) = request.status {
            event.status = status;
        }
        if let Some(featured) = request.featured {
            event.featured = featured;
        }
        if let Some(registration_open) = request.registration_open {
            event.registration_open = registration_open;
        }
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Registration>>> {
        let mut state = self.state.lock().await;
        if state.events.remove(&id).is_none() {
            return Ok(None);
        }

        let (removed, kept): (Vec<Registration>, Vec<Registration>) = std::mem::take(&mut state.registrations)
            .into_iter()
            .partition(|r| r.event_id == id);
        state.registrations = kept;
        for announcement in state.announcements.iter_mut() {
            if announcement.event_id == Some(id) {
                announcement.event_id = None;
            }
        }
        Ok(Some(removed))
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(events)
    }

    async fn featured(&self) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.featured && matches!(e.status, EventStatus::Upcoming | EventStatus::Live))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(events)
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let state = self.state.lock().await;
        Ok(EventCategory::ALL
            .iter()
            .map(|category| CategoryCount {
                category: *category,
                count: state.events.values().filter(|e| e.category == *category).count() as i64,
            })
            .collect())
    }

    async fn open_event_options(&self) -> Result<Vec<EventOption>> {
        let state = self.state.lock().await;
        let mut events: Vec<&Event> = state
            .events
            .values()
            .filter(|e| matches!(e.status, EventStatus::Upcoming | EventStatus::Live))
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events
            .into_iter()
            .map(|e| EventOption { id: e.id, title: e.title.clone() })
            .collect())
    }

    async fn count_by_status(&self, status: EventStatus) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state.events.values().filter(|e| e.status == status).count() as i64)
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn register(&self, user_id: Uuid, event_id: Uuid) -> Result<RegistrationOutcome> {
        let mut state = self.state.lock().await;
        let event = state.event(event_id)?;

        if !event.accepts_registrations() {
            return Err(EventHubError::RegistrationClosed { event_id });
        }
        if state.is_registered(user_id, event_id) {
            return Err(EventHubError::AlreadyRegistered { event_id });
        }
        if event.is_full() {
            return Err(EventHubError::EventFull { event_id });
        }

        let registration = Registration {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            registered_at: Utc::now(),
            attended: false,
        };
        state.registrations.push(registration.clone());

        let event = state.event_mut(event_id)?;
        event.current_attendees += 1;
        event.updated_at = Utc::now();

        Ok(RegistrationOutcome {
            registration,
            event: event.clone(),
        })
    }

    async fn unregister(&self, user_id: Uuid, event_id: Uuid) -> Result<UnregistrationOutcome> {
        let mut state = self.state.lock().await;
        state.event(event_id)?;

        let position = state
            .registrations
            .iter()
            .position(|r| r.user_id == user_id && r.event_id == event_id);
        let removed = position.map(|index| state.registrations.remove(index));

        let event = state.event_mut(event_id)?;
        if removed.is_some() {
            event.current_attendees = (event.current_attendees - 1).max(0);
            event.updated_at = Utc::now();
        }

        Ok(UnregistrationOutcome {
            removed,
            event: event.clone(),
        })
    }

    async fn is_registered(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        Ok(self.state.lock().await.is_registered(user_id, event_id))
    }

    async fn roster(&self, event_id: Uuid) -> Result<Vec<RosterEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<RosterEntry> = state
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .map(|r| {
                let profile = state.profiles.get(&r.user_id);
                RosterEntry {
                    id: r.id,
                    user_id: r.user_id,
                    event_id: r.event_id,
                    registered_at: r.registered_at,
                    attended: r.attended,
                    name: profile.map(|p| p.name.clone()),
                    email: profile.map(|p| p.email.clone()),
                    mobile: profile.and_then(|p| p.mobile.clone()),
                    year: profile.and_then(|p| p.year.clone()),
                    semester: profile.and_then(|p| p.semester.clone()),
                    course: profile.and_then(|p| p.course.clone()),
                }
            })
            .collect();
        entries.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(entries)
    }

    async fn set_attended(&self, registration_id: Uuid, attended: bool) -> Result<Option<Registration>> {
        let mut state = self.state.lock().await;
        Ok(state
            .registrations
            .iter_mut()
            .find(|r| r.id == registration_id)
            .map(|r| {
                r.attended = attended;
                r.clone()
            }))
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<UserRegistration>> {
        let state = self.state.lock().await;
        let mut items: Vec<UserRegistration> = state
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                state.events.get(&r.event_id).map(|event| UserRegistration {
                    registration: r.clone(),
                    event: event.clone(),
                })
            })
            .collect();
        items.sort_by(|a, b| b.registration.registered_at.cmp(&a.registration.registered_at));
        Ok(items)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.lock().await.registrations.len() as i64)
    }

    async fn recount(&self, event_id: Uuid) -> Result<Option<Event>> {
        let mut state = self.state.lock().await;
        let count = state.registrations.iter().filter(|r| r.event_id == event_id).count() as i32;
        Ok(state.events.get_mut(&event_id).map(|event| {
            event.current_attendees = count;
            event.updated_at = Utc::now();
            event.clone()
        }))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, request: UpdateProfileRequest) -> Result<Option<Profile>> {
        let mut state = self.state.lock().await;
        Ok(state.profiles.get_mut(&id).map(|profile| {
            if let Some(name) = request.name {
                profile.name = name;
            }
            if let Some(mobile) = request.mobile {
                profile.mobile = mobile;
            }
            if let Some(year) = request.year {
                profile.year = year;
            }
            if let Some(semester) = request.semester {
                profile.semester = semester;
            }
            if let Some(course) = request.course {
                profile.course = course;
            }
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn list_with_roles(&self) -> Result<Vec<UserWithRoles>> {
        let state = self.state.lock().await;
        let mut users: Vec<UserWithRoles> = state
            .profiles
            .values()
            .map(|profile| {
                let mut roles: Vec<AppRole> = state
                    .roles
                    .iter()
                    .filter(|g| g.user_id == profile.id)
                    .map(|g| g.role)
                    .collect();
                roles.sort();
                UserWithRoles { profile: profile.clone(), roles }
            })
            .collect();
        users.sort_by(|a, b| b.profile.created_at.cmp(&a.profile.created_at));
        Ok(users)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.lock().await.profiles.len() as i64)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<AppRole>> {
        let state = self.state.lock().await;
        let mut roles: Vec<AppRole> = state
            .roles
            .iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| g.role)
            .collect();
        roles.sort();
        Ok(roles)
    }

    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.roles.iter().any(|g| g.user_id == user_id && g.role == role))
    }

    async fn grant(&self, user_id: Uuid, role: AppRole) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|g| g.user_id == user_id && g.role == role) {
            return Ok(false);
        }
        state.roles.push(RoleGrant {
            id: Uuid::new_v4(),
            user_id,
            role,
            created_at: Utc::now(),
        });
        Ok(true)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.lock().await;
        if state
            .accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(EventHubError::InvalidInput(
                "An account with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            password_hash: account.password_hash,
            created_at: now,
        };
        state.accounts.insert(created.id, created.clone());
        state.profiles.insert(
            created.id,
            Profile {
                id: created.id,
                name: account.name,
                email: account.email,
                mobile: account.mobile,
                year: account.year,
                semester: None,
                course: None,
                created_at: now,
                updated_at: now,
            },
        );
        state.roles.push(RoleGrant {
            id: Uuid::new_v4(),
            user_id: created.id,
            role: AppRole::Student,
            created_at: now,
        });
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(account) = state.accounts.get_mut(&id) {
            account.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }

    async fn create_reset_token(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken> {
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            account_id,
            token_hash: token_hash.to_string(),
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        };
        self.state.lock().await.reset_tokens.push(token.clone());
        Ok(token)
    }

    async fn consume_reset_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        let mut state = self.state.lock().await;
        Ok(state
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && t.is_usable(now))
            .map(|t| {
                t.used_at = Some(now);
                t.account_id
            }))
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn create(&self, draft: AnnouncementDraft) -> Result<Announcement> {
        let now = Utc::now();
        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: draft.title,
            message: draft.message,
            link: draft.link,
            event_id: draft.event_id,
            is_important: draft.is_important,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.announcements.push(announcement.clone());
        Ok(announcement)
    }

    async fn update(&self, id: Uuid, draft: AnnouncementDraft) -> Result<Option<Announcement>> {
        let mut state = self.state.lock().await;
        Ok(state.announcements.iter_mut().find(|a| a.id == id).map(|a| {
            a.title = draft.title;
            a.message = draft.message;
            a.link = draft.link;
            a.event_id = draft.event_id;
            a.is_important = draft.is_important;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.announcements.len();
        state.announcements.retain(|a| a.id != id);
        Ok(state.announcements.len() < before)
    }

    async fn list(&self) -> Result<Vec<Announcement>> {
        let state = self.state.lock().await;
        let mut announcements = state.announcements.clone();
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }

    async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .announcements
            .iter()
            .filter(|a| since.map_or(true, |since| a.created_at > since))
            .count() as i64)
    }
}

#[async_trait]
impl DiscussionStore for MemoryStore {
    async fn create(&self, author_id: Uuid, title: String, description: String) -> Result<Discussion> {
        let now = Utc::now();
        let discussion = Discussion {
            id: Uuid::new_v4(),
            author_id,
            title,
            description,
            likes: 0,
            status: DiscussionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.discussions.insert(discussion.id, discussion.clone());
        Ok(discussion)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Discussion>> {
        Ok(self.state.lock().await.discussions.get(&id).cloned())
    }

    async fn list(&self, status: Option<DiscussionStatus>) -> Result<Vec<DiscussionWithAuthor>> {
        let state = self.state.lock().await;
        let mut discussions: Vec<DiscussionWithAuthor> = state
            .discussions
            .values()
            .filter(|d| status.map_or(true, |s| d.status == s))
            .map(|d| {
                let author = state.profiles.get(&d.author_id);
                DiscussionWithAuthor {
                    discussion: d.clone(),
                    author_name: author.map(|p| p.name.clone()),
                    author_year: author.and_then(|p| p.year.clone()),
                }
            })
            .collect();
        discussions.sort_by(|a, b| b.discussion.created_at.cmp(&a.discussion.created_at));
        Ok(discussions)
    }

    async fn set_status(&self, id: Uuid, status: DiscussionStatus) -> Result<Option<Discussion>> {
        let mut state = self.state.lock().await;
        Ok(state.discussions.get_mut(&id).map(|d| {
            d.status = status;
            d.updated_at = Utc::now();
            d.clone()
        }))
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<Option<LikeToggle>> {
        let mut state = self.state.lock().await;
        if !state.discussions.contains_key(&id) {
            return Ok(None);
        }

        let before = state.likes.len();
        state.likes.retain(|like| *like != (id, user_id));
        let liked = state.likes.len() == before;
        if liked {
            state.likes.push((id, user_id));
        }

        let likes = state.likes.iter().filter(|(d, _)| *d == id).count() as i32;
        Ok(state.discussions.get_mut(&id).map(|discussion| {
            discussion.likes = likes;
            discussion.updated_at = Utc::now();
            LikeToggle {
                discussion: discussion.clone(),
                liked,
            }
        }))
    }

    async fn add_reply(&self, discussion_id: Uuid, author_id: Uuid, content: String) -> Result<DiscussionReply> {
        let mut state = self.state.lock().await;
        if !state.discussions.contains_key(&discussion_id) {
            return Err(EventHubError::DiscussionNotFound { discussion_id });
        }
        let reply = DiscussionReply {
            id: Uuid::new_v4(),
            discussion_id,
            author_id,
            content,
            created_at: Utc::now(),
        };
        state.replies.push(reply.clone());
        Ok(reply)
    }

    async fn replies(&self, discussion_id: Uuid) -> Result<Vec<DiscussionReply>> {
        let state = self.state.lock().await;
        let mut replies: Vec<DiscussionReply> = state
            .replies
            .iter()
            .filter(|r| r.discussion_id == discussion_id)
            .cloned()
            .collect();
        replies.sort_by_key(|r| r.created_at);
        Ok(replies)
    }

    async fn count_by_status(&self, status: DiscussionStatus) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state.discussions.values().filter(|d| d.status == status).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_request(max_attendees: i32) -> CreateEventRequest {
        CreateEventRequest {
            title: "Hackathon".to_string(),
            description: "Twenty-four hours of building".to_string(),
            date: "2026-11-02".to_string(),
            time: "09:00".to_string(),
            location: "Main Auditorium".to_string(),
            category: EventCategory::Competition,
            max_attendees,
            status: None,
            featured: None,
            registration_open: None,
        }
    }

    #[tokio::test]
    async fn test_register_increments_and_unregister_decrements() {
        let store = MemoryStore::new();
        let event = EventStore::create(&store, Uuid::new_v4(), event_request(2)).await.unwrap();
        let user = Uuid::new_v4();

        let outcome = store.register(user, event.id).await.unwrap();
        assert_eq!(outcome.event.current_attendees, 1);

        let outcome = store.unregister(user, event.id).await.unwrap();
        assert_eq!(outcome.removed.map(|r| r.user_id), Some(user));
        assert_eq!(outcome.event.current_attendees, 0);

        let outcome = store.unregister(user, event.id).await.unwrap();
        assert!(outcome.removed.is_none());
        assert_eq!(outcome.event.current_attendees, 0);
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let store = MemoryStore::new();
        let event = EventStore::create(&store, Uuid::new_v4(), event_request(1)).await.unwrap();
        let first = Uuid::new_v4();

        store.register(first, event.id).await.unwrap();
        assert!(matches!(
            store.register(first, event.id).await,
            Err(EventHubError::AlreadyRegistered { .. })
        ));
        assert!(matches!(
            store.register(Uuid::new_v4(), event.id).await,
            Err(EventHubError::EventFull { .. })
        ));
        assert!(matches!(
            store.register(first, Uuid::new_v4()).await,
            Err(EventHubError::EventNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_refuses_capacity_below_attendees() {
        let store = MemoryStore::new();
        let event = EventStore::create(&store, Uuid::new_v4(), event_request(5)).await.unwrap();
        store.register(Uuid::new_v4(), event.id).await.unwrap();
        store.register(Uuid::new_v4(), event.id).await.unwrap();

        let request = UpdateEventRequest {
            max_attendees: Some(1),
            ..Default::default()
        };
        assert!(EventStore::update(&store, event.id, request).await.unwrap().is_none());

        let request = UpdateEventRequest {
            max_attendees: Some(2),
            ..Default::default()
        };
        let updated = EventStore::update(&store, event.id, request).await.unwrap().unwrap();
        assert!(updated.is_full());
    }

    #[tokio::test]
    async fn test_catalog_queries() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let later = CreateEventRequest {
            title: "AI Workshop".to_string(),
            date: "2026-12-01".to_string(),
            category: EventCategory::Workshop,
            featured: Some(true),
            ..event_request(40)
        };
        let finished = CreateEventRequest {
            featured: Some(true),
            status: Some(EventStatus::Completed),
            ..event_request(40)
        };
        let workshop = EventStore::create(&store, admin, later).await.unwrap();
        let hackathon = EventStore::create(&store, admin, event_request(40)).await.unwrap();
        EventStore::create(&store, admin, finished).await.unwrap();

        let all = EventStore::list(&store, &EventFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, hackathon.id);

        let search = EventFilter {
            search: Some("  ai ".to_string()),
            category: None,
        };
        let found = EventStore::list(&store, &search).await.unwrap();
        assert_eq!(found.iter().map(|e| e.id).collect::<Vec<_>>(), vec![workshop.id]);

        let featured = store.featured().await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, workshop.id);

        let counts = store.category_counts().await.unwrap();
        assert_eq!(counts.len(), EventCategory::ALL.len());
        let count_of = |category| counts.iter().find(|c| c.category == category).map(|c| c.count);
        assert_eq!(count_of(EventCategory::Competition), Some(2));
        assert_eq!(count_of(EventCategory::Workshop), Some(1));
        assert_eq!(count_of(EventCategory::Cultural), Some(0));
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_count() {
        let store = MemoryStore::new();
        let discussion = DiscussionStore::create(
            &store,
            Uuid::new_v4(),
            "Robotics club".to_string(),
            "Should we start a robotics club?".to_string(),
        )
        .await
        .unwrap();
        let user = Uuid::new_v4();

        let liked = store.toggle_like(discussion.id, user).await.unwrap().unwrap();
        assert_eq!(liked.outcome(), LikeOutcome { liked: true, likes: 1 });
        assert_eq!(liked.discussion.id, discussion.id);
        assert_eq!(liked.discussion.title, "Robotics club");
        let unliked = store.toggle_like(discussion.id, user).await.unwrap().unwrap();
        assert_eq!(unliked.outcome(), LikeOutcome { liked: false, likes: 0 });
        assert_eq!(unliked.discussion.likes, 0);
        assert!(store.toggle_like(Uuid::new_v4(), user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let store = MemoryStore::new();
        let account = store
            .create_account(NewAccount {
                email: "dev@college.edu".to_string(),
                password_hash: None,
                name: "Dev".to_string(),
                mobile: None,
                year: None,
            })
            .await
            .unwrap();
        let expires = Utc::now() + chrono::Duration::hours(1);
        store.create_reset_token(account.id, "abc", expires).await.unwrap();

        assert_eq!(store.consume_reset_token("abc", Utc::now()).await.unwrap(), Some(account.id));
        assert_eq!(store.consume_reset_token("abc", Utc::now()).await.unwrap(), None);
    }
}
