//! Unified error handling for the console API.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as a JSON body
//! `{ "ok": false, "error": "..." }`; server-side failures are captured to
//! Sentry and replaced with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use activity_console_core::{AdminUserId, GuardDenial};

use crate::db::{RepositoryError, SettingsError};
use crate::models::ActivityValidationError;
use crate::models::settings::SettingsValidationError;
use crate::services::{
    AdminAuthError, EmailError, ExportError, GrantError, InviteError, QrError, ScopeWriteError,
    TokenError,
};

/// Application-level error type for the console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Settings document could not be read or written.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Sign-in failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// The guard refused the action.
    #[error("{0}")]
    Denied(#[from] GuardDenial),

    /// A grant of admin access was refused.
    #[error("{0}")]
    Grant(#[from] GrantError),

    /// An invite was refused before anything was stored.
    #[error("{0}")]
    Invite(#[from] InviteError),

    /// No usable department for a write.
    #[error("{0}")]
    Scope(#[from] ScopeWriteError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// CSV export failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// QR rendering failed.
    #[error("QR error: {0}")]
    Qr(#[from] QrError),

    /// Secret hashing failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Maintenance mode is on.
    #[error("{0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ActivityValidationError> for AppError {
    fn from(err: ActivityValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<SettingsValidationError> for AppError {
    fn from(err: SettingsValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

const fn guard_status(denial: &GuardDenial) -> StatusCode {
    if denial.is_unauthenticated() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::FORBIDDEN
    }
}

const fn grant_status(err: &GrantError) -> StatusCode {
    match err {
        GrantError::Denied(denial) => guard_status(denial),
        GrantError::MissingRole | GrantError::MissingDepartment | GrantError::UnknownDepartment(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::FORBIDDEN,
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AdminAuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AdminAuthError::UserNotFound
                | AdminAuthError::InvalidCode
                | AdminAuthError::CodeExpired => StatusCode::UNAUTHORIZED,
                AdminAuthError::Inactive => StatusCode::FORBIDDEN,
                AdminAuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                AdminAuthError::Token(_) | AdminAuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Denied(denial) => guard_status(denial),
            Self::Grant(err) => grant_status(err),
            Self::Invite(err) => match err {
                InviteError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                InviteError::Grant(grant) => grant_status(grant),
            },
            Self::Scope(err) => match err {
                ScopeWriteError::Denied(denial) => guard_status(denial),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Email(_) => StatusCode::BAD_GATEWAY,
            Self::Settings(_)
            | Self::Export(_)
            | Self::Qr(_)
            | Self::Token(_)
            | Self::Session(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "ไม่พบข้อมูล (not found)".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) | Self::Conflict(msg) => msg.clone(),
            Self::Auth(err) => match err {
                AdminAuthError::InvalidEmail(_) => "อีเมลไม่ถูกต้อง (invalid email)".to_string(),
                AdminAuthError::UserNotFound | AdminAuthError::InvalidCode => {
                    "รหัสไม่ถูกต้อง (invalid code)".to_string()
                }
                AdminAuthError::CodeExpired => "รหัสหมดอายุ (code expired)".to_string(),
                AdminAuthError::TooManyAttempts => {
                    "ลองผิดหลายครั้งเกินไป กรุณาขอรหัสใหม่ (too many attempts)".to_string()
                }
                AdminAuthError::Inactive => "บัญชีนี้ถูกระงับ (account inactive)".to_string(),
                AdminAuthError::Token(_) | AdminAuthError::Repository(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Email(_) => "ส่งอีเมลไม่สำเร็จ (email delivery failed)".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Unavailable(msg) => msg.clone(),
            Self::Denied(_) | Self::Grant(_) | Self::Invite(_) | Self::Scope(_) => self.to_string(),
            Self::Database(_)
            | Self::Settings(_)
            | Self::Export(_)
            | Self::Qr(_)
            | Self::Token(_)
            | Self::Session(_)
            | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Console request error"
            );
        } else if status == StatusCode::FORBIDDEN {
            tracing::info!(reason = %self, "request denied");
        }

        let body = json!({ "ok": false, "error": self.client_message() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(admin_user_id: AdminUserId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use activity_console_core::{AdminPermission, AdminRole};

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("activity 12".to_string());
        assert_eq!(err.to_string(), "Not found: activity 12");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Denied(GuardDenial::NotAuthenticated)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Denied(GuardDenial::MissingPermission(
                AdminPermission::ExportData
            ))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("dup".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Unavailable("maintenance".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_grant_errors_split_between_400_and_403() {
        assert_eq!(
            AppError::Grant(GrantError::MissingDepartment).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Invite(InviteError::Grant(GrantError::RoleTooHigh {
                requested: AdminRole::SuperAdmin,
                actor: AdminRole::DepartmentAdmin,
            }))
            .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row 7".to_string()));
        assert_eq!(err.client_message(), "Internal server error");

        let err = AppError::Denied(GuardDenial::MissingPermission(AdminPermission::ManageAdmins));
        assert!(err.client_message().contains("manage_admins"));
    }
}
