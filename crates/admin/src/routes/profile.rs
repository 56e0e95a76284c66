//! Self-service profile handlers.

use std::path::Path as FsPath;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post, put},
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{AdminProfile, AvatarPosition, BannerStandards, ProfileUpdate, actions};
use crate::services::audit;
use crate::state::AppState;

/// Hard ceiling on an avatar request body; the configured limit is checked
/// per upload and is normally lower.
const AVATAR_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Longest accepted name field.
const MAX_NAME_CHARS: usize = 100;

/// Subdirectory of the upload dir holding avatars.
const AVATAR_DIR: &str = "avatars";

/// Build the profile router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(show).patch(update))
        .route(
            "/api/profile/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route("/api/profile/avatar/position", put(avatar_position))
}

fn check_name(field: &str, value: Option<&str>) -> Result<()> {
    if let Some(value) = value
        && value.trim().chars().count() > MAX_NAME_CHARS
    {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// Lower-case extension of an uploaded file name, if it is an allowed format.
fn avatar_extension(standards: &BannerStandards, file_name: &str) -> Option<String> {
    let ext = FsPath::new(file_name).extension()?.to_str()?;
    standards
        .allows_format(ext)
        .then(|| ext.to_ascii_lowercase())
}

/// GET /api/profile
#[instrument(skip(admin, state))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<AdminProfile>> {
    let profile = AdminUserRepository::new(state.pool())
        .get_by_id(admin.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("admin {}", admin.id)))?;
    Ok(Json(profile))
}

/// PATCH /api/profile
#[instrument(skip(admin, state, update))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<AdminProfile>> {
    check_name("display_name", update.display_name.as_deref())?;
    check_name("first_name", update.first_name.as_deref())?;
    check_name("last_name", update.last_name.as_deref())?;
    if update
        .display_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(AppError::BadRequest("display_name cannot be empty".to_string()));
    }

    let profile = AdminUserRepository::new(state.pool())
        .update_profile(admin.id, &update)
        .await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::PROFILE_UPDATE,
            "admin_user",
            Some(admin.id.to_string()),
            profile.department.key(),
            json!({
                "display_name": update.display_name,
                "first_name": update.first_name,
                "last_name": update.last_name,
            }),
        ),
    )
    .await;

    Ok(Json(profile))
}

/// Upload a new avatar image.
///
/// POST /api/profile/avatar
#[instrument(skip(admin, state, multipart))]
async fn upload_avatar(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AdminProfile>> {
    let standards = state.system_settings().await?.banner;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?
    {
        if !matches!(field.name(), Some("avatar" | "file")) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let ext = avatar_extension(&standards, &file_name).ok_or_else(|| {
            AppError::BadRequest(format!(
                "unsupported image format; allowed: {}",
                standards.allowed_formats.join(", ")
            ))
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
        upload = Some((ext, bytes));
        break;
    }

    let (ext, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("no avatar file in upload".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("avatar file is empty".to_string()));
    }
    if bytes.len() > standards.max_bytes() {
        return Err(AppError::BadRequest(format!(
            "avatar exceeds {} KB",
            standards.max_file_size_kb
        )));
    }

    let dir = state.config().upload_dir.join(AVATAR_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create upload dir: {e}")))?;
    let file_name = format!("{}-{}.{ext}", admin.id, Uuid::new_v4().simple());
    tokio::fs::write(dir.join(&file_name), &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store avatar: {e}")))?;

    let avatar_url = format!("/uploads/{AVATAR_DIR}/{file_name}");
    let profile = AdminUserRepository::new(state.pool())
        .set_avatar(admin.id, &avatar_url)
        .await?;

    tracing::info!(admin_id = %admin.id, bytes = bytes.len(), %avatar_url, "avatar uploaded");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::PROFILE_UPDATE,
            "admin_user",
            Some(admin.id.to_string()),
            profile.department.key(),
            json!({ "avatar_url": avatar_url }),
        ),
    )
    .await;

    Ok(Json(profile))
}

/// PUT /api/profile/avatar/position
#[instrument(skip(admin, state))]
async fn avatar_position(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(position): Json<AvatarPosition>,
) -> Result<Json<AdminProfile>> {
    position.validate().map_err(AppError::BadRequest)?;

    let profile = AdminUserRepository::new(state.pool())
        .set_avatar_position(admin.id, position)
        .await?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_extension_follows_standards() {
        let standards = BannerStandards::default();
        assert_eq!(avatar_extension(&standards, "me.PNG").as_deref(), Some("png"));
        assert_eq!(avatar_extension(&standards, "me.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(avatar_extension(&standards, "me.gif"), None);
        assert_eq!(avatar_extension(&standards, "no_extension"), None);
    }

    #[test]
    fn test_check_name_limits_length() {
        assert!(check_name("first_name", Some("Somchai")).is_ok());
        assert!(check_name("first_name", None).is_ok());
        let long = "ก".repeat(MAX_NAME_CHARS + 1);
        assert!(check_name("first_name", Some(&long)).is_err());
    }
}
