//! Own profile routes

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::models::*;
use crate::services::Session;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/completion", get(completion))
}

async fn get_profile(State(state): State<AppState>, session: Session) -> Result<Json<Profile>> {
    Ok(Json(state.services.profiles.get(&session, session.user_id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    Ok(Json(state.services.profiles.update_own(&session, request).await?))
}

async fn completion(State(state): State<AppState>, session: Session) -> Result<Json<ProfileCompletion>> {
    Ok(Json(state.services.profiles.completion(&session).await?))
}
