//! Sign-in route handlers.
//!
//! Admins sign in with a six-digit code sent to their email. Requesting a
//! code answers the same way whether or not the email belongs to an admin.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use activity_console_core::Email;

use super::{Ack, ack};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdminAuth, clear_current_admin, session_admin, set_current_admin};
use crate::models::{CurrentAdmin, actions};
use crate::services::auth::LOGIN_CODE_TTL_MINUTES;
use crate::services::{AdminAuthService, audit};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login/send-code", post(send_code))
        .route("/api/auth/login/verify", post(verify))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// Email a sign-in code.
///
/// POST /api/auth/login/send-code
#[instrument(skip(state, body))]
async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeRequest>,
) -> Result<Json<Ack>> {
    let email = Email::parse_normalized(&body.email)
        .map_err(|_| AppError::BadRequest("อีเมลไม่ถูกต้อง (invalid email)".to_string()))?;

    let service = AdminAuthService::new(state.pool(), &state.config().session_secret);
    let Some(issued) = service.issue_code(&email).await? else {
        return Ok(ack());
    };

    match state.email() {
        Some(mailer) => {
            mailer
                .send_login_code(issued.email.as_str(), &issued.code, LOGIN_CODE_TTL_MINUTES)
                .await?;
        }
        None => {
            tracing::info!(email = %issued.email, code = %issued.code, "SMTP disabled, sign-in code not emailed");
        }
    }

    Ok(ack())
}

/// Exchange a code for a session.
///
/// POST /api/auth/login/verify
#[instrument(skip(state, session, body))]
async fn verify(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<CurrentAdmin>> {
    let email = Email::parse_normalized(&body.email)
        .map_err(|_| AppError::BadRequest("อีเมลไม่ถูกต้อง (invalid email)".to_string()))?;

    let service = AdminAuthService::new(state.pool(), &state.config().session_secret);
    let profile = service.verify_code(&email, &body.code).await?;
    let admin = CurrentAdmin::from(&profile);

    session.cycle_id().await?;
    set_current_admin(&session, &admin).await?;
    set_sentry_user(admin.id, Some(admin.email.as_str()));

    tracing::info!(admin_id = %admin.id, role = %admin.role, "admin signed in");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::LOGIN,
            "admin_user",
            Some(admin.id.to_string()),
            admin.department.key(),
            json!({}),
        ),
    )
    .await;

    Ok(Json(admin))
}

/// End the session.
///
/// POST /api/auth/logout
#[instrument(skip(state, session))]
async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<Ack>> {
    if let Some(admin) = session_admin(&session).await {
        audit::record(
            state.pool(),
            audit::entry(
                &admin,
                actions::LOGOUT,
                "admin_user",
                Some(admin.id.to_string()),
                admin.department.key(),
                json!({}),
            ),
        )
        .await;
    }

    clear_current_admin(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(ack())
}

/// The signed-in admin.
///
/// GET /api/auth/me
async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<CurrentAdmin> {
    Json(admin)
}
