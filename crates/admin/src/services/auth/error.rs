//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::tokens::TokenError;

/// Errors that can occur during admin sign-in.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] activity_console_core::EmailError),

    /// No admin account for this email.
    #[error("admin user not found")]
    UserNotFound,

    /// The admin account has been revoked or deactivated.
    #[error("admin account is inactive")]
    Inactive,

    /// Code missing, wrong, or already used.
    #[error("invalid sign-in code")]
    InvalidCode,

    /// Code is past its expiry.
    #[error("sign-in code has expired")]
    CodeExpired,

    /// Too many wrong guesses for the current code.
    #[error("too many attempts; request a new code")]
    TooManyAttempts,

    /// Secret hashing failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
