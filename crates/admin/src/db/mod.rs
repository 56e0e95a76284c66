//! Database operations for the console `PostgreSQL` schema.
//!
//! # Schema: `console`
//!
//! ## Tables
//!
//! - `admin_user` - Admin profiles with role, department and permission overrides
//! - `admin_invite` - Pending and historical admin invites
//! - `login_code` - One-time sign-in codes (hashed)
//! - `student` - Students who can check in to activities
//! - `activity` - Activities with check-in geofence and QR payload
//! - `activity_record` - Attendance entries
//! - `admin_log` - Audit log of admin mutations
//! - `admin_notification` - Per-admin notifications
//! - `settings` - Global and per-admin settings (JSONB)
//! - `session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p activity-console-cli -- migrate
//! ```

pub mod activities;
pub mod admin_invites;
pub mod admin_logs;
pub mod admin_users;
pub mod login_codes;
pub mod notifications;
pub mod records;
pub mod settings;
pub mod students;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use activities::ActivityRepository;
pub use admin_invites::AdminInviteRepository;
pub use admin_logs::AdminLogRepository;
pub use admin_users::AdminUserRepository;
pub use login_codes::LoginCodeRepository;
pub use notifications::NotificationRepository;
pub use records::ActivityRecordRepository;
pub use settings::SettingsError;
pub use students::StudentRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn unique_as_conflict(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("64%_1"), "%64\\%\\_1%");
        assert_eq!(like_pattern("สมชาย"), "%สมชาย%");
    }
}
