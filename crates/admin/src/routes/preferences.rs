//! Per-admin console preferences.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Ack, ack};
use crate::db::settings;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::settings::SECTION_PREFERENCE_KEY;
use crate::state::AppState;

/// Longest accepted section name.
const MAX_SECTION_LEN: usize = 64;

/// Build the preferences router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/preferences/section", get(show).put(save))
}

/// Last selected console section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPreference {
    pub section: Option<String>,
}

fn valid_section(section: &str) -> bool {
    !section.is_empty()
        && section.len() <= MAX_SECTION_LEN
        && section
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

/// GET /api/preferences/section
#[instrument(skip(admin, state))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<SectionPreference>> {
    let stored = settings::get_user_setting(state.pool(), admin.id, SECTION_PREFERENCE_KEY).await?;
    let section = stored
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);
    Ok(Json(SectionPreference { section }))
}

/// PUT /api/preferences/section
#[instrument(skip(admin, state))]
async fn save(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<SectionPreference>,
) -> Result<Json<Ack>> {
    match body.section.as_deref().map(str::trim) {
        None | Some("") => {
            settings::delete_user_setting(state.pool(), admin.id, SECTION_PREFERENCE_KEY).await?;
        }
        Some(section) if valid_section(section) => {
            let value = serde_json::Value::String(section.to_owned());
            settings::set_user_setting(state.pool(), admin.id, SECTION_PREFERENCE_KEY, &value)
                .await?;
        }
        Some(_) => {
            return Err(AppError::BadRequest("invalid section name".to_string()));
        }
    }
    Ok(ack())
}
