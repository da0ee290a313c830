//! Account routes: sign-up, sign-in, password reset and OAuth

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::rate_limit::limit_auth_requests;
use crate::models::*;
use crate::services::{AuthResponse, Session};
use crate::state::AppState;
use crate::utils::errors::{EventHubError, Result};

pub fn routes(state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/password-reset", post(request_password_reset))
        .route_layer(from_fn_with_state(state, limit_auth_requests));

    Router::new()
        .merge(limited)
        .route("/auth/signout", post(sign_out))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
        .route("/auth/oauth/:provider", get(oauth_start))
        .route("/auth/oauth/:provider/callback", get(oauth_callback))
}

async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.services.auth.sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn sign_in(State(state): State<AppState>, Json(request): Json<SignInRequest>) -> Result<Json<AuthResponse>> {
    Ok(Json(state.services.auth.sign_in(request).await?))
}

async fn sign_out(State(state): State<AppState>, session: Session) -> StatusCode {
    state.services.auth.sign_out(&session).await;
    StatusCode::NO_CONTENT
}

async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<Json<Value>> {
    state.services.auth.request_password_reset(request).await?;
    Ok(Json(json!({
        "message": "If an account exists for this email, a password reset link has been sent."
    })))
}

async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirmation>,
) -> Result<Json<Value>> {
    state.services.auth.confirm_password_reset(request).await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

async fn oauth_start(State(state): State<AppState>, Path(provider): Path<String>) -> Result<Redirect> {
    let url = state.services.auth.oauth_authorize_url(&provider).await?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Json<AuthResponse>> {
    if let Some(error) = callback.error {
        return Err(EventHubError::Authentication(format!("OAuth sign-in was not completed: {}", error)));
    }
    let (Some(code), Some(oauth_state)) = (callback.code, callback.state) else {
        return Err(EventHubError::InvalidInput("Missing OAuth code or state".to_string()));
    };

    let response = state
        .services
        .auth
        .complete_oauth(&provider, &code, &oauth_state)
        .await?;
    Ok(Json(response))
}
