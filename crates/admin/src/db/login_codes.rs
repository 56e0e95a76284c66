//! One-time sign-in codes.
//!
//! Codes are stored as an HMAC keyed by the session secret. Issuing a new
//! code retires every earlier unconsumed code for the same email.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use activity_console_core::Email;

use super::RepositoryError;

/// Wrong guesses allowed before a code is burned.
pub const MAX_ATTEMPTS: i32 = 5;

/// An outstanding sign-in code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoginCode {
    pub id: i32,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
}

impl LoginCode {
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.attempts < MAX_ATTEMPTS && now < self.expires_at
    }
}

/// Repository for sign-in code operations.
pub struct LoginCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LoginCodeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code, retiring older ones for the same email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub async fn issue(
        &self,
        email: &Email,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE console.login_code
            SET consumed_at = NOW()
            WHERE email = $1 AND consumed_at IS NULL
            ",
        )
        .bind(email.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO console.login_code (email, code_hash, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(email.as_str())
        .bind(code_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The newest unconsumed code for `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_active(&self, email: &Email) -> Result<Option<LoginCode>, RepositoryError> {
        let code = sqlx::query_as::<_, LoginCode>(
            r"
            SELECT id, code_hash, attempts, expires_at
            FROM console.login_code
            WHERE email = $1 AND consumed_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(code)
    }

    /// Count a wrong guess. Returns the new attempt count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_failed_attempt(&self, id: i32) -> Result<i32, RepositoryError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE console.login_code
            SET attempts = attempts + 1
            WHERE id = $1
            RETURNING attempts
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(attempts)
    }

    /// Mark a code used. Returns false if it was consumed concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn consume(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE console.login_code SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete codes that expired more than a day ago.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM console.login_code WHERE expires_at < NOW() - INTERVAL '1 day'",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn code(attempts: i32, expires_in: Duration) -> LoginCode {
        LoginCode {
            id: 1,
            code_hash: String::new(),
            attempts,
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn test_usable_until_attempts_exhausted() {
        let now = Utc::now();
        assert!(code(0, Duration::minutes(5)).is_usable(now));
        assert!(code(MAX_ATTEMPTS - 1, Duration::minutes(5)).is_usable(now));
        assert!(!code(MAX_ATTEMPTS, Duration::minutes(5)).is_usable(now));
    }

    #[test]
    fn test_expired_code_unusable() {
        assert!(!code(0, Duration::minutes(-1)).is_usable(Utc::now()));
    }
}
