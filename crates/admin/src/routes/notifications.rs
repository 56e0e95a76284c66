//! Notification handlers and the live event feed.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::instrument;

use activity_console_core::NotificationId;

use super::{Ack, ack};
use crate::db::NotificationRepository;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::AdminNotification;
use crate::services::LiveEvent;
use crate::state::AppState;

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/read-all", post(read_all))
        .route("/api/notifications/{id}/read", post(read))
        .route("/api/events", get(events))
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub items: Vec<AdminNotification>,
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    pub ok: bool,
    pub updated: u64,
}

/// GET /api/notifications
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<NotificationList>> {
    let repo = NotificationRepository::new(state.pool());
    let items = repo.list_for(admin.id).await?;
    let unread = repo.unread_count(admin.id).await?;
    Ok(Json(NotificationList { items, unread }))
}

/// POST /api/notifications/{id}/read
#[instrument(skip(admin, state))]
async fn read(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> Result<Json<Ack>> {
    NotificationRepository::new(state.pool())
        .mark_read(id, admin.id)
        .await?;
    Ok(ack())
}

/// POST /api/notifications/read-all
#[instrument(skip(admin, state))]
async fn read_all(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ReadAllResponse>> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(admin.id)
        .await?;
    Ok(Json(ReadAllResponse { ok: true, updated }))
}

/// Render a live event as an SSE frame.
fn to_sse(event: &LiveEvent) -> Event {
    let json = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::warn!(event = event.name(), error = %e, "failed to encode live event");
        "{}".to_string()
    });
    Event::default().event(event.name()).data(json)
}

/// Server-sent event feed for the signed-in admin.
///
/// GET /api/events
#[instrument(skip(admin, state))]
async fn events(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!(admin_id = %admin.id, "live feed subscribed");
    let feed = state
        .events()
        .stream_for(admin)
        .map(|event| Ok(to_sse(&event)));
    Sse::new(feed).keep_alive(KeepAlive::default())
}
