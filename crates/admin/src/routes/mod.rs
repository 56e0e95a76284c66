//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness check
//! GET  /health/ready                         - Readiness check (database)
//!
//! # Auth (email one-time code)
//! POST /api/auth/login/send-code             - Email a sign-in code
//! POST /api/auth/login/verify                - Exchange code for a session
//! POST /api/auth/logout                      - End the session
//! GET  /api/auth/me                          - Signed-in admin
//!
//! # Attendance
//! GET  /api/records                          - Scoped list (view_reports)
//! GET  /api/records/export                   - CSV download (export_data)
//! POST /api/records/bulk-delete              - Delete by id (manage_activities)
//!
//! # Activities
//! GET  /api/activities                       - Scoped list
//! POST /api/activities                       - Create (manage_activities)
//! GET  /api/activities/{id}                  - Detail
//! PUT  /api/activities/{id}                  - Replace (manage_activities)
//! DELETE /api/activities/{id}                - Delete (manage_activities)
//! POST /api/activities/{id}/toggle           - Flip active (manage_activities)
//! GET  /api/activities/{id}/qr.svg           - Check-in QR image
//! POST /api/activities/{id}/geofence-check   - Distance from the venue
//! POST /api/checkin                          - Public student check-in
//!
//! # Invites ({ok, error?, items?} envelope)
//! POST /api/invites/send
//! POST /api/invites/cancel
//! POST /api/invites/delete
//! GET  /api/invites/list
//! POST /api/invites/accept                   - Public, token based
//!
//! # Admin users (manage_admins)
//! GET  /api/admin-users
//! POST /api/admin-users/promote
//! GET  /api/admin-users/{id}
//! PATCH /api/admin-users/{id}
//! DELETE /api/admin-users/{id}
//! POST /api/admin-users/{id}/permissions/reset
//!
//! # Profile (self)
//! GET  /api/profile
//! PATCH /api/profile
//! POST /api/profile/avatar                   - Multipart upload
//! PUT  /api/profile/avatar/position
//!
//! # Students (manage_users)
//! GET  /api/students
//! POST /api/students
//! GET  /api/students/{id}
//! PUT  /api/students/{id}
//! DELETE /api/students/{id}
//!
//! # Logs, settings, notifications
//! GET  /api/logs                             - Audit log (view_reports)
//! GET  /api/settings/system                  - Any admin
//! PUT  /api/settings/system                  - system_settings
//! GET  /api/notifications
//! POST /api/notifications/{id}/read
//! POST /api/notifications/read-all
//! GET  /api/events                           - SSE live feed
//! GET  /api/preferences/section
//! PUT  /api/preferences/section
//! ```

pub mod activities;
pub mod admin_users;
pub mod auth;
pub mod checkin;
pub mod health;
pub mod invites;
pub mod logs;
pub mod notifications;
pub mod preferences;
pub mod profile;
pub mod records;
pub mod settings;
pub mod students;

use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Body of a mutation that has nothing else to return.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ack {
    pub ok: bool,
}

/// `{ "ok": true }`.
#[must_use]
pub const fn ack() -> Json<Ack> {
    Json(Ack { ok: true })
}

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(records::router())
        .merge(activities::router())
        .merge(checkin::router())
        .merge(invites::router())
        .merge(admin_users::router())
        .merge(profile::router())
        .merge(students::router())
        .merge(logs::router())
        .merge(settings::router())
        .merge(notifications::router())
        .merge(preferences::router())
}
