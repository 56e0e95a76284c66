//! Authentication extractor for console handlers.
//!
//! The session holds a [`CurrentAdmin`] snapshot. On every authenticated
//! request the snapshot is checked against the stored profile so that a
//! revoked admin loses access immediately and role or permission edits take
//! effect without signing out.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use activity_console_core::GuardDenial;

use crate::db::AdminUserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in, active admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.display_name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let snapshot = session_admin(&session)
            .await
            .ok_or(AppError::Denied(GuardDenial::NotAuthenticated))?;

        let profile = AdminUserRepository::new(state.pool())
            .get_by_id(snapshot.id)
            .await?;

        let Some(profile) = profile.filter(|p| p.is_active) else {
            tracing::info!(admin_id = %snapshot.id, "session admin missing or inactive, signing out");
            clear_current_admin(&session).await?;
            return Err(AppError::Denied(GuardDenial::NotAuthenticated));
        };

        let current = CurrentAdmin::from(&profile);
        if current != snapshot {
            set_current_admin(&session, &current).await?;
        }
        set_sentry_user(current.id, Some(current.email.as_str()));

        Ok(Self(current))
    }
}

/// Read the session snapshot without touching the database.
pub async fn session_admin(session: &Session) -> Option<CurrentAdmin> {
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

/// Store the admin snapshot; called at sign-in and when the profile drifts.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Drop the admin snapshot (sign-out, or a revoked account).
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}
