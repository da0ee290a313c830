//! Public announcement board

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::Announcement;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/announcements", get(list))
        .route("/announcements/unread-count", get(unread_count))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Announcement>>> {
    Ok(Json(state.services.announcements.list().await?))
}

#[derive(Debug, Deserialize)]
struct UnreadQuery {
    since: Option<DateTime<Utc>>,
}

async fn unread_count(State(state): State<AppState>, Query(query): Query<UnreadQuery>) -> Result<Json<Value>> {
    let count = state.services.announcements.unread_count(query.since).await?;
    Ok(Json(json!({ "count": count })))
}
