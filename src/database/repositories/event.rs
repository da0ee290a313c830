//! Event repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::EventStore;
use crate::models::announcement::EventOption;
use crate::models::event::{CategoryCount, CreateEventRequest, Event, EventCategory, EventFilter, EventStatus, UpdateEventRequest};
use crate::models::registration::Registration;
use crate::utils::errors::EventHubError;

pub(crate) const EVENT_COLUMNS: &str = "id, title, description, date, time, location, category, status, current_attendees, max_attendees, featured, registration_open, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    /// Create a new event
    async fn create(&self, created_by: Uuid, request: CreateEventRequest) -> Result<Event, EventHubError> {
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, title, description, date, time, location, category, status, max_attendees, featured, registration_open, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.title)
        .bind(request.description)
        .bind(request.date)
        .bind(request.time)
        .bind(request.location)
        .bind(request.category)
        .bind(request.status.unwrap_or(EventStatus::Upcoming))
        .bind(request.max_attendees)
        .bind(request.featured.unwrap_or(false))
        .bind(request.registration_open.unwrap_or(true))
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, EventHubError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Update event
    async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Option<Event>, EventHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                date = COALESCE($4, date),
                time = COALESCE($5, time),
                location = COALESCE($6, location),
                category = COALESCE($7, category),
                max_attendees = COALESCE($8, max_attendees),
                status = COALESCE($9, status),
                featured = COALESCE($10, featured),
                registration_open = COALESCE($11, registration_open),
                updated_at = $12
            WHERE id = $1 AND COALESCE($8, max_attendees) >= current_attendees
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.date)
        .bind(request.time)
        .bind(request.location)
        .bind(request.category)
        .bind(request.max_attendees)
        .bind(request.status)
        .bind(request.featured)
        .bind(request.registration_open)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Delete event. Registrations are removed explicitly so the caller
    /// learns which rows the cascade took.
    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Registration>>, EventHubError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query_as::<_, Registration>(
            r#"
            DELETE FROM event_registrations WHERE event_id = $1
            RETURNING id, user_id, event_id, registered_at, attended
            "#
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(removed))
    }

    /// List events matching a search and category filter
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, EventHubError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
              AND ($2::event_category IS NULL OR category = $2)
            ORDER BY date ASC, created_at ASC
            "#
        ))
        .bind(search)
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get featured upcoming and live events
    async fn featured(&self) -> Result<Vec<Event>, EventHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE featured = true AND status IN ('upcoming', 'live') ORDER BY date ASC, created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Count events per category
    async fn category_counts(&self) -> Result<Vec<CategoryCount>, EventHubError> {
        let rows: Vec<(EventCategory, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM events GROUP BY category"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(EventCategory::ALL
            .iter()
            .map(|category| CategoryCount {
                category: *category,
                count: rows
                    .iter()
                    .find(|(c, _)| c == category)
                    .map_or(0, |(_, count)| *count),
            })
            .collect())
    }

    /// Events an announcement may refer to
    async fn open_event_options(&self) -> Result<Vec<EventOption>, EventHubError> {
        let options = sqlx::query_as::<_, EventOption>(
            "SELECT id, title FROM events WHERE status IN ('upcoming', 'live') ORDER BY date ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    /// Count events with a given status
    async fn count_by_status(&self, status: EventStatus) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
