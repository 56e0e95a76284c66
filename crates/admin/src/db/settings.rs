//! Settings database operations.
//!
//! Global settings rows have a NULL `admin_user_id`; per-admin preferences
//! carry the owner's id. Values are JSONB.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use activity_console_core::AdminUserId;

use crate::models::SystemSettings;
use crate::models::settings::SYSTEM_SETTINGS_KEY;

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Get a global setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, SettingsError> {
    let result = sqlx::query_scalar::<_, JsonValue>(
        r"
        SELECT value FROM console.settings
        WHERE key = $1 AND admin_user_id IS NULL
        ",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(result)
}

/// Set a global setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(
    pool: &PgPool,
    key: &str,
    value: &JsonValue,
    updated_by: Option<AdminUserId>,
) -> Result<(), SettingsError> {
    sqlx::query(
        r"
        INSERT INTO console.settings (key, value, admin_user_id, updated_by)
        VALUES ($1, $2, NULL, $3)
        ON CONFLICT (key, admin_user_id)
        DO UPDATE SET value = $2, updated_by = $3, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .bind(updated_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the system settings document, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the query fails or the stored document cannot be decoded.
pub async fn get_system_settings(pool: &PgPool) -> Result<SystemSettings, SettingsError> {
    match get_setting(pool, SYSTEM_SETTINGS_KEY).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(SystemSettings::default()),
    }
}

/// Replace the system settings document.
///
/// # Errors
///
/// Returns an error if serialization or the database write fails.
pub async fn set_system_settings(
    pool: &PgPool,
    settings: &SystemSettings,
    updated_by: AdminUserId,
) -> Result<(), SettingsError> {
    let value = serde_json::to_value(settings)?;
    set_setting(pool, SYSTEM_SETTINGS_KEY, &value, Some(updated_by)).await
}

/// Get a user-specific setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_user_setting(
    pool: &PgPool,
    user_id: AdminUserId,
    key: &str,
) -> Result<Option<JsonValue>, SettingsError> {
    let result = sqlx::query_scalar::<_, JsonValue>(
        r"
        SELECT value FROM console.settings
        WHERE key = $1 AND admin_user_id = $2
        ",
    )
    .bind(key)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(result)
}

/// Set a user-specific setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_user_setting(
    pool: &PgPool,
    user_id: AdminUserId,
    key: &str,
    value: &JsonValue,
) -> Result<(), SettingsError> {
    sqlx::query(
        r"
        INSERT INTO console.settings (key, value, admin_user_id, updated_by)
        VALUES ($1, $2, $3, $3)
        ON CONFLICT (key, admin_user_id) DO UPDATE SET value = $2, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a user-specific setting.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn delete_user_setting(
    pool: &PgPool,
    user_id: AdminUserId,
    key: &str,
) -> Result<(), SettingsError> {
    sqlx::query(
        r"
        DELETE FROM console.settings
        WHERE key = $1 AND admin_user_id = $2
        ",
    )
    .bind(key)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
