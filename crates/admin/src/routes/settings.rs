//! System settings handlers.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::json;
use tracing::instrument;

use activity_console_core::AdminPermission;

use crate::db::settings::set_system_settings;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::{SystemSettings, actions};
use crate::services::{LiveEvent, audit};
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings/system", get(show).put(update))
}

/// GET /api/settings/system
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<SystemSettings>> {
    Ok(Json(state.system_settings().await?))
}

/// PUT /api/settings/system
#[instrument(skip(admin, state, settings))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(settings): Json<SystemSettings>,
) -> Result<Json<SystemSettings>> {
    admin.require(AdminPermission::SystemSettings)?;
    let settings = settings.normalized();
    settings.validate()?;

    let previous = state.system_settings().await?;
    set_system_settings(state.pool(), &settings, admin.id).await?;
    state.cache_system_settings(settings.clone()).await;

    if previous.maintenance.enabled != settings.maintenance.enabled {
        tracing::warn!(
            enabled = settings.maintenance.enabled,
            admin_id = %admin.id,
            "maintenance mode changed"
        );
    }
    state.events().publish(LiveEvent::SettingsChanged {
        maintenance_enabled: settings.maintenance.enabled,
    });

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::SETTINGS_UPDATE,
            "settings",
            None,
            admin.department.key(),
            json!({ "before": previous, "after": settings }),
        ),
    )
    .await;

    Ok(Json(settings))
}
