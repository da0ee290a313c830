//! HTTP handlers module
//!
//! Routes grouped by area. Public reads live next to their authenticated
//! counterparts; everything under `/admin` needs the admin capability.

pub mod admin;
pub mod announcements;
pub mod auth;
pub mod community;
pub mod events;
pub mod health;
pub mod profile;
pub mod realtime;

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::ServerConfig;
use crate::middleware::logging::trace_layer;
use crate::state::AppState;

/// The complete application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server);

    Router::new()
        .merge(health::routes())
        .merge(auth::routes(state.clone()))
        .merge(events::routes())
        .merge(profile::routes())
        .merge(announcements::routes())
        .merge(community::routes())
        .merge(realtime::routes())
        .merge(admin::routes())
        .layer(cors)
        .layer(trace_layer())
        .with_state(state)
}

pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(60 * 60));

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
