//! Authentication extractors
//!
//! Handlers take a [`Session`] when the caller must be signed in, or a
//! [`MaybeSession`] when signing in only changes what they see. Both read a
//! `Bearer` session token and resolve capabilities through the shared
//! resolver, so admin checks never hit the role store on every request.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::services::capabilities::Session;
use crate::state::AppState;
use crate::utils::errors::EventHubError;

/// Session when a valid token was presented, `None` otherwise
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
    pub fn as_ref(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = EventHubError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(EventHubError::Unauthenticated)?;
        state.services.auth.authenticate(token).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = EventHubError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        match state.services.auth.authenticate(token).await {
            Ok(session) => Ok(Self(Some(session))),
            Err(EventHubError::Token(e)) => {
                debug!(error = %e, "Ignoring unusable session token on public route");
                Ok(Self(None))
            }
            Err(e) => Err(e),
        }
    }
}
