//! Administrative routes
//!
//! Every handler here goes through a service call that checks the admin
//! capability on the caller's session before touching the store.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::community::StatusFilter;
use crate::models::*;
use crate::services::{DeadLetter, NotificationStats, Session};
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/events", post(create_event))
        .route("/admin/events/:id", put(update_event).delete(delete_event))
        .route("/admin/events/:id/status", put(set_event_status))
        .route("/admin/events/:id/recount", post(recount))
        .route("/admin/events/:id/registrations", get(roster))
        .route("/admin/events/:id/registrations.csv", get(roster_csv))
        .route("/admin/registrations/:id/attended", put(set_attended))
        .route("/admin/announcements", post(create_announcement))
        .route("/admin/announcements/event-options", get(event_options))
        .route(
            "/admin/announcements/:id",
            put(update_announcement).delete(delete_announcement),
        )
        .route("/admin/community", get(moderation_queue))
        .route("/admin/community/:id/status", put(set_discussion_status))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(user_profile))
        .route("/admin/users/:id/admin", post(grant_admin))
        .route("/admin/analytics", get(analytics))
        .route("/admin/notifications/dead-letters", get(dead_letters))
}

async fn create_event(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.services.events.create(&session, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>> {
    Ok(Json(state.services.events.update(&session, event_id, request).await?))
}

#[derive(Debug, Deserialize)]
struct EventStatusChange {
    status: EventStatus,
}

async fn set_event_status(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
    Json(change): Json<EventStatusChange>,
) -> Result<Json<Event>> {
    Ok(Json(state.services.events.set_status(&session, event_id, change.status).await?))
}

async fn delete_event(State(state): State<AppState>, session: Session, Path(event_id): Path<Uuid>) -> Result<StatusCode> {
    state.services.events.delete(&session, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recount(State(state): State<AppState>, session: Session, Path(event_id): Path<Uuid>) -> Result<Json<Event>> {
    Ok(Json(state.services.registrations.recount(&session, event_id).await?))
}

async fn roster(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<RosterEntry>>> {
    Ok(Json(state.services.registrations.roster(&session, event_id).await?))
}

async fn roster_csv(State(state): State<AppState>, session: Session, Path(event_id): Path<Uuid>) -> Result<Response> {
    let export = state
        .services
        .registrations
        .export_roster_csv(&session, event_id)
        .await?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.content,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct AttendanceChange {
    attended: bool,
}

async fn set_attended(
    State(state): State<AppState>,
    session: Session,
    Path(registration_id): Path<Uuid>,
    Json(change): Json<AttendanceChange>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registrations
        .set_attended(&session, registration_id, change.attended)
        .await?;
    Ok(Json(registration))
}

async fn create_announcement(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<AnnouncementInput>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let announcement = state.services.announcements.create(&session, input).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

async fn update_announcement(
    State(state): State<AppState>,
    session: Session,
    Path(announcement_id): Path<Uuid>,
    Json(input): Json<AnnouncementInput>,
) -> Result<Json<Announcement>> {
    let announcement = state
        .services
        .announcements
        .update(&session, announcement_id, input)
        .await?;
    Ok(Json(announcement))
}

async fn delete_announcement(
    State(state): State<AppState>,
    session: Session,
    Path(announcement_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.services.announcements.delete(&session, announcement_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn event_options(State(state): State<AppState>, session: Session) -> Result<Json<Vec<EventOption>>> {
    Ok(Json(state.services.announcements.event_options(&session).await?))
}

async fn moderation_queue(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<DiscussionWithAuthor>>> {
    Ok(Json(state.services.community.moderation_queue(&session, filter.status).await?))
}

#[derive(Debug, Deserialize)]
struct DiscussionStatusChange {
    status: DiscussionStatus,
}

async fn set_discussion_status(
    State(state): State<AppState>,
    session: Session,
    Path(discussion_id): Path<Uuid>,
    Json(change): Json<DiscussionStatusChange>,
) -> Result<Json<Discussion>> {
    let discussion = state
        .services
        .community
        .set_status(&session, discussion_id, change.status)
        .await?;
    Ok(Json(discussion))
}

async fn list_users(State(state): State<AppState>, session: Session) -> Result<Json<Vec<UserWithRoles>>> {
    Ok(Json(state.services.profiles.list_users(&session).await?))
}

async fn user_profile(State(state): State<AppState>, session: Session, Path(user_id): Path<Uuid>) -> Result<Json<Profile>> {
    session.require_admin()?;
    Ok(Json(state.services.profiles.get(&session, user_id).await?))
}

async fn grant_admin(State(state): State<AppState>, session: Session, Path(user_id): Path<Uuid>) -> Result<Json<Value>> {
    let granted = state.services.profiles.grant_admin(&session, user_id).await?;
    Ok(Json(json!({ "user_id": user_id, "granted": granted })))
}

async fn analytics(State(state): State<AppState>, session: Session) -> Result<Json<AdminAnalytics>> {
    Ok(Json(state.services.profiles.analytics(&session).await?))
}

#[derive(Debug, Serialize)]
struct DeadLetterReport {
    stats: NotificationStats,
    dead_letters: Vec<DeadLetter>,
}

async fn dead_letters(State(state): State<AppState>, session: Session) -> Result<Json<DeadLetterReport>> {
    session.require_admin()?;
    let notifications = &state.services.notifications;
    Ok(Json(DeadLetterReport {
        stats: notifications.stats(),
        dead_letters: notifications.dead_letters().await,
    }))
}
