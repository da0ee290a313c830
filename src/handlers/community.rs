//! Community board routes

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::*;
use crate::services::Session;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/community", get(list).post(create))
        .route("/community/:id/like", post(toggle_like))
        .route("/community/:id/replies", get(replies).post(reply))
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<DiscussionStatus>,
}

async fn list(State(state): State<AppState>, Query(filter): Query<StatusFilter>) -> Result<Json<Vec<DiscussionWithAuthor>>> {
    Ok(Json(state.services.community.list(filter.status).await?))
}

async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CreateDiscussionRequest>,
) -> Result<(StatusCode, Json<Discussion>)> {
    let discussion = state.services.community.create(&session, request).await?;
    Ok((StatusCode::CREATED, Json(discussion)))
}

async fn toggle_like(
    State(state): State<AppState>,
    session: Session,
    Path(discussion_id): Path<Uuid>,
) -> Result<Json<LikeOutcome>> {
    Ok(Json(state.services.community.toggle_like(&session, discussion_id).await?))
}

async fn replies(State(state): State<AppState>, Path(discussion_id): Path<Uuid>) -> Result<Json<Vec<DiscussionReply>>> {
    Ok(Json(state.services.community.replies(discussion_id).await?))
}

async fn reply(
    State(state): State<AppState>,
    session: Session,
    Path(discussion_id): Path<Uuid>,
    Json(request): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<DiscussionReply>)> {
    let reply = state.services.community.reply(&session, discussion_id, request).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
