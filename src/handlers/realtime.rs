//! Server-sent change feed
//!
//! `GET /realtime?tables=events,announcements` streams changes to the named
//! tables (all tables when omitted) to a signed-in caller. Each SSE event is
//! named after its table and carries the JSON change. A client that falls
//! behind receives a `lagged` event with the number of missed changes and
//! should refetch.
//!
//! Role grants stream to admins only. Registration changes stream to admins
//! and to the registrant.

use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::services::capabilities::Session;
use crate::services::{ChangeFeed, ChangeTable};
use crate::state::AppState;
use crate::utils::errors::{EventHubError, Result};

pub fn routes() -> Router<AppState> {
    Router::new().route("/realtime", get(subscribe))
}

#[derive(Debug, Deserialize)]
struct RealtimeQuery {
    tables: Option<String>,
}

pub fn parse_tables(tables: Option<&str>) -> Result<HashSet<ChangeTable>> {
    tables
        .unwrap_or_default()
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.parse::<ChangeTable>())
        .collect()
}

async fn subscribe(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RealtimeQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    if !state.settings.features.realtime {
        return Err(EventHubError::ServiceUnavailable("Realtime updates are disabled".to_string()));
    }

    let tables = parse_tables(query.tables.as_deref())?;
    if tables.contains(&ChangeTable::UserRoles) {
        session.require_admin()?;
    }
    let keep_alive = Duration::from_secs(state.settings.realtime.keep_alive_seconds.max(1));
    debug!(user_id = %session.user_id, tables = ?tables, "Realtime subscriber connected");

    Ok(Sse::new(change_stream(&state.services.feed, session, tables))
        .keep_alive(KeepAlive::new().interval(keep_alive)))
}

pub fn change_stream(
    feed: &ChangeFeed,
    session: Session,
    tables: HashSet<ChangeTable>,
) -> impl Stream<Item = std::result::Result<SseEvent, Infallible>> {
    let mut receiver = feed.subscribe();

    async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(change) => {
                    if !tables.is_empty() && !tables.contains(&change.table) {
                        continue;
                    }
                    if !change.visible_to(&session) {
                        continue;
                    }
                    match SseEvent::default().event(change.table.as_str()).json_data(&change) {
                        Ok(event) => yield Ok::<SseEvent, Infallible>(event),
                        Err(e) => warn!(error = %e, "Dropping unserializable change"),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Realtime subscriber lagged");
                    yield Ok(SseEvent::default().event("lagged").data(missed.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
