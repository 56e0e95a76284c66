//! Admin authentication service.
//!
//! Sign-in is by one-time email code. Codes are six digits, valid for
//! [`LOGIN_CODE_TTL_MINUTES`], allow [`MAX_ATTEMPTS`] wrong guesses and are
//! consumed on first successful use. Only active admins can sign in.

mod error;

pub use error::AdminAuthError;

use chrono::{Duration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;

use activity_console_core::Email;

use crate::db::login_codes::MAX_ATTEMPTS;
use crate::db::{AdminUserRepository, LoginCodeRepository};
use crate::models::AdminProfile;
use crate::services::email::generate_login_code;
use crate::services::tokens::{hash_secret, verify_secret};

/// Minutes a sign-in code stays valid.
pub const LOGIN_CODE_TTL_MINUTES: i64 = 10;

/// A code that should be delivered to the admin.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub email: Email,
    pub code: String,
}

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: AdminUserRepository<'a>,
    codes: LoginCodeRepository<'a>,
    secret: &'a SecretString,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, secret: &'a SecretString) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
            codes: LoginCodeRepository::new(pool),
            secret,
        }
    }

    /// Issue a sign-in code for `email`.
    ///
    /// Returns `None` when the email does not belong to an active admin, so
    /// callers can answer both cases identically.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Repository` on database failure.
    pub async fn issue_code(&self, email: &Email) -> Result<Option<IssuedCode>, AdminAuthError> {
        let Some(admin) = self.users.get_by_email(email).await? else {
            tracing::info!(email = %email, "sign-in code requested for unknown email");
            return Ok(None);
        };
        if !admin.is_active {
            tracing::info!(admin_id = %admin.id, "sign-in code requested for inactive admin");
            return Ok(None);
        }

        let code = generate_login_code();
        let hash = hash_secret(self.secret, &code)?;
        let expires_at = Utc::now() + Duration::minutes(LOGIN_CODE_TTL_MINUTES);
        self.codes.issue(email, &hash, expires_at).await?;

        match self.codes.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "purged stale sign-in codes"),
            Err(e) => tracing::warn!(error = %e, "failed to purge stale sign-in codes"),
        }

        Ok(Some(IssuedCode {
            email: email.clone(),
            code,
        }))
    }

    /// Check a code and return the signed-in admin.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode`, `CodeExpired` or `TooManyAttempts` for a bad
    /// code, `UserNotFound` or `Inactive` for an unusable account.
    pub async fn verify_code(&self, email: &Email, code: &str) -> Result<AdminProfile, AdminAuthError> {
        let Some(stored) = self.codes.latest_active(email).await? else {
            return Err(AdminAuthError::InvalidCode);
        };

        if stored.attempts >= MAX_ATTEMPTS {
            self.codes.consume(stored.id).await?;
            return Err(AdminAuthError::TooManyAttempts);
        }
        if Utc::now() >= stored.expires_at {
            return Err(AdminAuthError::CodeExpired);
        }

        if !verify_secret(self.secret, code.trim(), &stored.code_hash) {
            let attempts = self.codes.record_failed_attempt(stored.id).await?;
            if attempts >= MAX_ATTEMPTS {
                self.codes.consume(stored.id).await?;
                return Err(AdminAuthError::TooManyAttempts);
            }
            return Err(AdminAuthError::InvalidCode);
        }

        if !self.codes.consume(stored.id).await? {
            return Err(AdminAuthError::InvalidCode);
        }

        let admin = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AdminAuthError::UserNotFound)?;
        if !admin.is_active {
            return Err(AdminAuthError::Inactive);
        }

        if let Err(e) = self.users.touch_last_login(admin.id).await {
            tracing::warn!(admin_id = %admin.id, error = %e, "failed to record last login");
        }

        Ok(admin)
    }
}
