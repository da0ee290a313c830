//! Registration ledger model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::event::{Event, EventStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
}

/// Result of a committed registration: the ledger row and the event with its new counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    pub registration: Registration,
    pub event: Event,
}

/// Result of an unregistration attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregistrationOutcome {
    /// The deleted ledger row; `None` when there was nothing to delete
    /// and the counter was left alone
    pub removed: Option<Registration>,
    pub event: Event,
}

/// Which action a viewer is offered for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationAffordance {
    NotRegistered,
    Registered,
    Full,
    Closed,
}

impl RegistrationAffordance {
    pub fn resolve(event: &Event, registered: bool) -> Self {
        if event.status.is_closed() {
            RegistrationAffordance::Closed
        } else if registered {
            RegistrationAffordance::Registered
        } else if event.is_full() {
            RegistrationAffordance::Full
        } else if !event.registration_open {
            RegistrationAffordance::Closed
        } else {
            RegistrationAffordance::NotRegistered
        }
    }

    /// Button caption shown by the web client
    pub fn label(&self, status: EventStatus) -> &'static str {
        match self {
            RegistrationAffordance::NotRegistered => "Register Now",
            RegistrationAffordance::Registered => "Cancel Registration",
            RegistrationAffordance::Full => "Event Full",
            RegistrationAffordance::Closed => match status {
                EventStatus::Completed => "Event Completed",
                EventStatus::Cancelled => "Event Cancelled",
                _ => "Registration Closed",
            },
        }
    }
}

/// Roster line: a registration joined with the registrant's profile
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub year: Option<String>,
    pub semester: Option<String>,
    pub course: Option<String>,
}

/// One of a student's registrations joined with its event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegistration {
    pub registration: Registration,
    pub event: Event,
}

/// A student's registrations split by event status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MyRegistrations {
    pub current: Vec<UserRegistration>,
    pub past: Vec<UserRegistration>,
}

impl MyRegistrations {
    pub fn from_registrations(registrations: Vec<UserRegistration>) -> Self {
        let mut split = MyRegistrations::default();
        for item in registrations {
            match item.event.status {
                EventStatus::Upcoming => split.current.push(item),
                EventStatus::Completed => split.past.push(item),
                EventStatus::Live | EventStatus::Cancelled => {}
            }
        }
        split
    }
}
