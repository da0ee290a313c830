//! Registration workflow
//!
//! Joining and leaving an event's roster, with the attendee counter kept in
//! step with the ledger by the store. Side effects (change feed, confirmation
//! email) happen after the store commits and never change the outcome.

use std::time::Instant;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::*;
use crate::services::capabilities::Session;
use crate::services::notification::NotificationService;
use crate::services::realtime::{ChangeFeed, ChangeTable};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{csv_row, sanitize_filename};
use crate::utils::logging::{log_admin_action, log_database_operation, log_event_action};

pub const ROSTER_CSV_HEADER: [&str; 8] = [
    "Name",
    "Email",
    "Mobile",
    "Course",
    "Year",
    "Semester",
    "Registered At",
    "Attended",
];

/// An event as seen by one viewer
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub registered: bool,
    pub affordance: RegistrationAffordance,
    pub action_label: &'static str,
}

impl EventDetail {
    pub fn new(event: Event, registered: bool) -> Self {
        let affordance = RegistrationAffordance::resolve(&event, registered);
        let action_label = affordance.label(event.status);
        Self {
            event,
            registered,
            affordance,
            action_label,
        }
    }
}

/// Roster export ready to be served as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

#[derive(Clone)]
pub struct RegistrationService {
    db: DatabaseService,
    feed: ChangeFeed,
    notifications: NotificationService,
}

impl RegistrationService {
    pub fn new(db: DatabaseService, feed: ChangeFeed, notifications: NotificationService) -> Self {
        Self {
            db,
            feed,
            notifications,
        }
    }

    /// Register the caller for an event
    pub async fn register(&self, session: &Session, event_id: Uuid) -> Result<RegistrationOutcome> {
        let started = Instant::now();
        let result = self.db.registrations.register(session.user_id, event_id).await;
        log_database_operation(
            "register",
            "event_registrations",
            started.elapsed().as_millis() as u64,
            !matches!(result, Err(EventHubError::Database(_))),
        );

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log_event_action(event_id, "register_rejected", session.user_id, Some(&e.to_string()));
                return Err(e);
            }
        };

        log_event_action(
            event_id,
            "register",
            session.user_id,
            Some(&format!(
                "{}/{} attendees",
                outcome.event.current_attendees, outcome.event.max_attendees
            )),
        );
        self.feed.inserted(ChangeTable::EventRegistrations, outcome.registration.id, &outcome.registration);
        self.feed.updated(ChangeTable::Events, event_id, &outcome.event);

        self.send_confirmation(session, &outcome.event).await;

        Ok(outcome)
    }

    /// Best-effort confirmation email; failures are logged only
    async fn send_confirmation(&self, session: &Session, event: &Event) {
        let profile = match self.db.profiles.find_by_id(session.user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "Profile lookup for confirmation email failed");
                return;
            }
        };

        let (name, email) = match &profile {
            Some(p) => (p.name.as_str(), p.email.as_str()),
            None => (session.email.as_str(), session.email.as_str()),
        };
        if !self.notifications.send_registration_confirmation(name, email, event).await {
            warn!(user_id = %session.user_id, event_id = %event.id, "Confirmation email not queued");
        }
    }

    /// Cancel the caller's registration. Only a removed ledger row moves the counter.
    pub async fn unregister(&self, session: &Session, event_id: Uuid) -> Result<Event> {
        let outcome = self.db.registrations.unregister(session.user_id, event_id).await?;
        let removed = outcome.removed.ok_or(EventHubError::RegistrationNotFound)?;

        log_event_action(event_id, "unregister", session.user_id, None);
        self.feed.removed(ChangeTable::EventRegistrations, removed.id, &removed);
        self.feed.updated(ChangeTable::Events, event_id, &outcome.event);

        Ok(outcome.event)
    }

    pub async fn check_registered(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        self.db.registrations.is_registered(user_id, event_id).await
    }

    /// Event with the viewer's registration state and action
    pub async fn event_detail(&self, session: Option<&Session>, event_id: Uuid) -> Result<EventDetail> {
        let event = self
            .db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        let registered = match session {
            Some(session) => self.check_registered(session.user_id, event_id).await?,
            None => false,
        };

        Ok(EventDetail::new(event, registered))
    }

    pub async fn my_registrations(&self, session: &Session) -> Result<MyRegistrations> {
        let registrations = self.db.registrations.for_user(session.user_id).await?;
        Ok(MyRegistrations::from_registrations(registrations))
    }

    async fn require_event(&self, event_id: Uuid) -> Result<Event> {
        self.db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })
    }

    pub async fn roster(&self, session: &Session, event_id: Uuid) -> Result<Vec<RosterEntry>> {
        session.require_admin()?;
        self.require_event(event_id).await?;
        self.db.registrations.roster(event_id).await
    }

    pub async fn export_roster_csv(&self, session: &Session, event_id: Uuid) -> Result<CsvExport> {
        session.require_admin()?;
        let event = self.require_event(event_id).await?;
        let roster = self.db.registrations.roster(event_id).await?;

        log_admin_action(session.user_id, "export_roster", Some(&event_id.to_string()), None);
        Ok(CsvExport {
            filename: format!("{}_registrations.csv", sanitize_filename(&event.title)),
            content: roster_csv(&roster),
        })
    }

    pub async fn set_attended(&self, session: &Session, registration_id: Uuid, attended: bool) -> Result<Registration> {
        session.require_admin()?;
        let registration = self
            .db
            .registrations
            .set_attended(registration_id, attended)
            .await?
            .ok_or(EventHubError::RegistrationNotFound)?;

        log_admin_action(
            session.user_id,
            "set_attended",
            Some(&registration_id.to_string()),
            Some(if attended { "attended" } else { "absent" }),
        );
        self.feed.updated(ChangeTable::EventRegistrations, registration.id, &registration);
        Ok(registration)
    }

    /// Recompute the attendee counter from the ledger
    pub async fn recount(&self, session: &Session, event_id: Uuid) -> Result<Event> {
        session.require_admin()?;
        let before = self.require_event(event_id).await?;
        let event = self
            .db
            .registrations
            .recount(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        if before.current_attendees != event.current_attendees {
            warn!(
                event_id = %event_id,
                stored = before.current_attendees,
                ledger = event.current_attendees,
                "Attendee counter drift corrected"
            );
        }
        log_admin_action(session.user_id, "recount", Some(&event_id.to_string()), None);
        self.feed.updated(ChangeTable::Events, event_id, &event);
        Ok(event)
    }
}

/// Render a roster as CSV: plain header, every data cell quoted
pub fn roster_csv(roster: &[RosterEntry]) -> String {
    let mut lines = vec![ROSTER_CSV_HEADER.join(",")];
    for entry in roster {
        let registered_at = entry.registered_at.format("%Y-%m-%d %H:%M:%S").to_string();
        lines.push(csv_row([
            entry.name.as_deref().unwrap_or(""),
            entry.email.as_deref().unwrap_or(""),
            entry.mobile.as_deref().unwrap_or(""),
            entry.course.as_deref().unwrap_or(""),
            entry.year.as_deref().unwrap_or(""),
            entry.semester.as_deref().unwrap_or(""),
            registered_at.as_str(),
            if entry.attended { "Yes" } else { "No" },
        ]));
    }
    lines.join("\n")
}
