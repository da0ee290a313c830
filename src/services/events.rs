//! Event catalog and admin event editor

use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::*;
use crate::services::capabilities::Session;
use crate::services::realtime::{ChangeFeed, ChangeTable};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::require_text;
use crate::utils::logging::log_admin_action;

pub const MIN_CAPACITY: i32 = 1;
pub const MAX_CAPACITY: i32 = 100_000;

#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    feed: ChangeFeed,
}

impl EventService {
    pub fn new(db: DatabaseService, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.db.events.list(filter).await
    }

    pub async fn featured(&self) -> Result<Vec<Event>> {
        self.db.events.featured().await
    }

    pub async fn categories(&self) -> Result<Vec<CategoryCount>> {
        self.db.events.category_counts().await
    }

    pub async fn get(&self, event_id: Uuid) -> Result<Event> {
        self.db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })
    }

    pub async fn create(&self, session: &Session, request: CreateEventRequest) -> Result<Event> {
        session.require_admin()?;
        let request = validate_create(request)?;

        let event = self.db.events.create(session.user_id, request).await?;

        log_admin_action(session.user_id, "create_event", Some(&event.id.to_string()), Some(&event.title));
        self.feed.inserted(ChangeTable::Events, event.id, &event);
        Ok(event)
    }

    pub async fn update(&self, session: &Session, event_id: Uuid, request: UpdateEventRequest) -> Result<Event> {
        session.require_admin()?;
        let current = self.get(event_id).await?;
        let request = validate_update(request, &current)?;

        // `None` here means the row changed underneath us: capacity dropped below
        // a concurrent registration count, or the event was deleted.
        let event = match self.db.events.update(event_id, request).await? {
            Some(event) => event,
            None => {
                return match self.db.events.find_by_id(event_id).await? {
                    Some(event) => Err(capacity_below_attendees(event.current_attendees)),
                    None => Err(EventHubError::EventNotFound { event_id }),
                };
            }
        };

        log_admin_action(session.user_id, "update_event", Some(&event_id.to_string()), None);
        self.feed.updated(ChangeTable::Events, event_id, &event);
        Ok(event)
    }

    pub async fn set_status(&self, session: &Session, event_id: Uuid, status: EventStatus) -> Result<Event> {
        let request = UpdateEventRequest {
            status: Some(status),
            ..Default::default()
        };
        self.update(session, event_id, request).await
    }

    /// Delete an event. Its registrations go with it, and each one is
    /// published as a registration delete before the event delete.
    pub async fn delete(&self, session: &Session, event_id: Uuid) -> Result<()> {
        session.require_admin()?;
        let removed = self
            .db
            .events
            .delete(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        log_admin_action(
            session.user_id,
            "delete_event",
            Some(&event_id.to_string()),
            Some(&format!("{} registrations removed", removed.len())),
        );
        for registration in &removed {
            self.feed.removed(ChangeTable::EventRegistrations, registration.id, registration);
        }
        self.feed.deleted(ChangeTable::Events, event_id);
        Ok(())
    }
}

fn capacity_below_attendees(current: i32) -> EventHubError {
    EventHubError::InvalidInput(format!(
        "Max attendees cannot be less than current attendees ({})",
        current
    ))
}

fn validate_capacity(max_attendees: i32) -> Result<()> {
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&max_attendees) {
        return Err(EventHubError::InvalidInput(format!(
            "Max attendees must be between {} and {}",
            MIN_CAPACITY, MAX_CAPACITY
        )));
    }
    Ok(())
}

fn validate_create(request: CreateEventRequest) -> Result<CreateEventRequest> {
    validate_capacity(request.max_attendees)?;
    Ok(CreateEventRequest {
        title: require_text(&request.title, "Title")?,
        description: require_text(&request.description, "Description")?,
        date: require_text(&request.date, "Date")?,
        time: require_text(&request.time, "Time")?,
        location: require_text(&request.location, "Location")?,
        ..request
    })
}

fn validate_update(request: UpdateEventRequest, current: &Event) -> Result<UpdateEventRequest> {
    let required = |value: Option<String>, field: &str| -> Result<Option<String>> {
        value.map(|v| require_text(&v, field)).transpose()
    };

    if let Some(max_attendees) = request.max_attendees {
        validate_capacity(max_attendees)?;
        if max_attendees < current.current_attendees {
            return Err(capacity_below_attendees(current.current_attendees));
        }
    }

    Ok(UpdateEventRequest {
        title: required(request.title, "Title")?,
        description: required(request.description, "Description")?,
        date: required(request.date, "Date")?,
        time: required(request.time, "Time")?,
        location: required(request.location, "Location")?,
        ..request
    })
}
