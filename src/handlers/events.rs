//! Event catalog and registration routes

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::auth::MaybeSession;
use crate::models::*;
use crate::services::{EventDetail, Session};
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/featured", get(featured_events))
        .route("/events/:id", get(event_detail))
        .route(
            "/events/:id/registration",
            get(registration_status).post(register).delete(unregister),
        )
        .route("/categories", get(categories))
        .route("/dashboard", get(dashboard))
}

async fn list_events(State(state): State<AppState>, Query(filter): Query<EventFilter>) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.services.events.list(&filter).await?))
}

async fn featured_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.services.events.featured().await?))
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryCount>>> {
    Ok(Json(state.services.events.categories().await?))
}

async fn event_detail(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventDetail>> {
    let detail = state
        .services
        .registrations
        .event_detail(session.as_ref(), event_id)
        .await?;
    Ok(Json(detail))
}

async fn registration_status(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let registered = state
        .services
        .registrations
        .check_registered(session.user_id, event_id)
        .await?;
    Ok(Json(json!({ "registered": registered })))
}

async fn register(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<RegistrationOutcome>)> {
    let outcome = state.services.registrations.register(&session, event_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn unregister(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>> {
    Ok(Json(state.services.registrations.unregister(&session, event_id).await?))
}

async fn dashboard(State(state): State<AppState>, session: Session) -> Result<Json<MyRegistrations>> {
    Ok(Json(state.services.registrations.my_registrations(&session).await?))
}
