//! Registration repository implementation
//!
//! The ledger insert/delete and the attendee counter change share one
//! transaction, with the event row locked for its duration.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::event::EVENT_COLUMNS;
use crate::database::store::RegistrationStore;
use crate::models::event::Event;
use crate::models::registration::{
    Registration, RegistrationOutcome, RosterEntry, UnregistrationOutcome, UserRegistration,
};
use crate::utils::errors::EventHubError;

#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for RegistrationRepository {
    async fn register(&self, user_id: Uuid, event_id: Uuid) -> Result<RegistrationOutcome, EventHubError> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(EventHubError::EventNotFound { event_id })?;

        if !event.accepts_registrations() {
            return Err(EventHubError::RegistrationClosed { event_id });
        }

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM event_registrations WHERE user_id = $1 AND event_id = $2"
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(EventHubError::AlreadyRegistered { event_id });
        }

        if event.is_full() {
            return Err(EventHubError::EventFull { event_id });
        }

        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO event_registrations (id, user_id, event_id, registered_at, attended)
            VALUES ($1, $2, $3, $4, false)
            RETURNING id, user_id, event_id, registered_at, attended
            "#
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(event_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("SELECT increment_event_attendees($1)")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(RegistrationOutcome { registration, event })
    }

    async fn unregister(&self, user_id: Uuid, event_id: Uuid) -> Result<UnregistrationOutcome, EventHubError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        let removed = sqlx::query_as::<_, Registration>(
            r#"
            DELETE FROM event_registrations WHERE user_id = $1 AND event_id = $2
            RETURNING id, user_id, event_id, registered_at, attended
            "#
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        if removed.is_some() {
            sqlx::query("SELECT decrement_event_attendees($1)")
                .bind(event_id)
                .execute(&mut *tx)
                .await?;
        }

        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(UnregistrationOutcome { removed, event })
    }

    async fn is_registered(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, EventHubError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM event_registrations WHERE user_id = $1 AND event_id = $2)"
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    /// Registrations for an event joined with registrant profiles, newest first
    async fn roster(&self, event_id: Uuid) -> Result<Vec<RosterEntry>, EventHubError> {
        let entries = sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT r.id, r.user_id, r.event_id, r.registered_at, r.attended,
                   p.name, p.email, p.mobile, p.year, p.semester, p.course
            FROM event_registrations r
            LEFT JOIN profiles p ON p.id = r.user_id
            WHERE r.event_id = $1
            ORDER BY r.registered_at DESC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn set_attended(&self, registration_id: Uuid, attended: bool) -> Result<Option<Registration>, EventHubError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            UPDATE event_registrations SET attended = $2
            WHERE id = $1
            RETURNING id, user_id, event_id, registered_at, attended
            "#
        )
        .bind(registration_id)
        .bind(attended)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<UserRegistration>, EventHubError> {
        let registrations = sqlx::query_as::<_, Registration>(
            r#"
            SELECT id, user_id, event_id, registered_at, attended
            FROM event_registrations
            WHERE user_id = $1
            ORDER BY registered_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if registrations.is_empty() {
            return Ok(Vec::new());
        }

        let event_ids: Vec<Uuid> = registrations.iter().map(|r| r.event_id).collect();
        let events: HashMap<Uuid, Event> = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"
        ))
        .bind(&event_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|event| (event.id, event))
        .collect();

        Ok(registrations
            .into_iter()
            .filter_map(|registration| {
                events
                    .get(&registration.event_id)
                    .cloned()
                    .map(|event| UserRegistration { registration, event })
            })
            .collect())
    }

    async fn count(&self) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_registrations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn recount(&self, event_id: Uuid) -> Result<Option<Event>, EventHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET current_attendees = (SELECT COUNT(*) FROM event_registrations WHERE event_id = $1),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }
}
