//! Admin invite repository.
//!
//! Only the HMAC of an invite token is stored. Accepting an invite flips the
//! status with a conditional update inside the same transaction that creates
//! the admin row, so a token can be redeemed at most once.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use activity_console_core::{
    AdminDepartment, AdminInviteId, AdminRole, AdminUserId, Email, InviteStatus, RawPermissions,
};

use super::RepositoryError;
use super::admin_users::{CURRENT_SCHEMA_VERSION, permissions_json};
use crate::models::{AdminInvite, NewInvite};

const INVITE_COLUMNS: &str = "id, email, role, department, permissions, status, invited_by, \
     invited_by_email, created_at, expires_at, accepted_at, accepted_by, cancelled_at";

#[derive(Debug, sqlx::FromRow)]
struct AdminInviteRow {
    id: i32,
    email: String,
    role: String,
    department: String,
    permissions: Value,
    status: String,
    invited_by: Option<i32>,
    invited_by_email: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    accepted_by: Option<i32>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<AdminInviteRow> for AdminInvite {
    type Error = RepositoryError;

    fn try_from(row: AdminInviteRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |what: &str, detail: String| {
            RepositoryError::DataCorruption(format!("invalid {what} on invite {id}: {detail}"))
        };
        let email = Email::parse(&row.email).map_err(|e| corrupt("email", e.to_string()))?;
        let role: AdminRole = row.role.parse().map_err(|e: activity_console_core::RoleError| {
            corrupt("role", e.to_string())
        })?;
        let department = AdminDepartment::parse_lenient(&row.department)
            .ok_or_else(|| corrupt("department", row.department.clone()))?;
        let status: InviteStatus = row
            .status
            .parse()
            .map_err(|e: activity_console_core::StatusError| corrupt("status", e.to_string()))?;

        Ok(Self {
            id: AdminInviteId::new(id),
            email,
            role,
            department,
            permissions: RawPermissions::from_value(Some(&row.permissions)).into_granted(),
            status,
            invited_by: row.invited_by.map(AdminUserId::new),
            invited_by_email: row.invited_by_email,
            created_at: row.created_at,
            expires_at: row.expires_at,
            accepted_at: row.accepted_at,
            accepted_by: row.accepted_by.map(AdminUserId::new),
            cancelled_at: row.cancelled_at,
        })
    }
}

/// Names supplied by the invitee when redeeming a token.
#[derive(Debug, Clone)]
pub struct InviteAcceptance {
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// Repository for admin invite database operations.
pub struct AdminInviteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminInviteRepository<'a> {
    /// Create a new invite repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new pending invite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already has a pending invite.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, invite: &NewInvite) -> Result<AdminInvite, RepositoryError> {
        let row = sqlx::query_as::<_, AdminInviteRow>(&format!(
            r"
            INSERT INTO console.admin_invite
                (email, role, department, permissions, token_hash,
                 invited_by, invited_by_email, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(invite.email.as_str())
        .bind(invite.role.as_str())
        .bind(invite.department.key())
        .bind(permissions_json(&invite.permissions))
        .bind(&invite.token_hash)
        .bind(invite.invited_by)
        .bind(invite.invited_by_email.as_deref())
        .bind(invite.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "a pending invite already exists"))?;

        row.try_into()
    }

    /// List every invite, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<AdminInvite>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminInviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM console.admin_invite ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                AdminInvite::try_from(row)
                    .inspect_err(|e| tracing::error!(invite_id = id, error = %e, "skipping unreadable invite"))
                    .ok()
            })
            .collect())
    }

    /// Get an invite by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AdminInviteId) -> Result<Option<AdminInvite>, RepositoryError> {
        sqlx::query_as::<_, AdminInviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM console.admin_invite WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    /// Get an invite by the hash of its token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AdminInvite>, RepositoryError> {
        sqlx::query_as::<_, AdminInviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM console.admin_invite WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    /// Returns true if the email has an unexpired pending invite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_open_invite(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM console.admin_invite
                WHERE email = $1 AND status = 'pending' AND expires_at > NOW()
            )
            ",
        )
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Mark stale pending invites for `email` as expired so a new one can be issued.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn expire_stale(&self, email: &Email) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE console.admin_invite
            SET status = 'expired'
            WHERE email = $1 AND status = 'pending' AND expires_at <= NOW()
            ",
        )
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Redeem an invite and create the admin it describes.
    ///
    /// Returns the accepted invite and the id of the new admin row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no pending, unexpired invite matches.
    /// Returns `RepositoryError::Conflict` if an admin with the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn accept(
        &self,
        token_hash: &str,
        acceptance: &InviteAcceptance,
    ) -> Result<(AdminInvite, AdminUserId), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AdminInviteRow>(&format!(
            r"
            UPDATE console.admin_invite
            SET status = 'accepted', accepted_at = NOW()
            WHERE token_hash = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        let invite = AdminInvite::try_from(row)?;

        // An empty grant list on the invite means role defaults.
        let permissions =
            (!invite.permissions.is_empty()).then(|| permissions_json(&invite.permissions));

        let admin_id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO console.admin_user
                (email, display_name, first_name, last_name, role, department,
                 permissions, created_by, schema_version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(invite.email.as_str())
        .bind(acceptance.display_name.trim())
        .bind(acceptance.first_name.trim())
        .bind(acceptance.last_name.trim())
        .bind(invite.role.as_str())
        .bind(invite.department.key())
        .bind(permissions)
        .bind(invite.invited_by)
        .bind(CURRENT_SCHEMA_VERSION)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "admin already exists"))?;

        sqlx::query("UPDATE console.admin_invite SET accepted_by = $2 WHERE id = $1")
            .bind(invite.id)
            .bind(admin_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let admin_id = AdminUserId::new(admin_id);
        Ok((
            AdminInvite {
                accepted_by: Some(admin_id),
                ..invite
            },
            admin_id,
        ))
    }

    /// Cancel a pending invite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invite doesn't exist.
    /// Returns `RepositoryError::Conflict` if the invite is no longer pending.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn cancel(&self, id: AdminInviteId) -> Result<AdminInvite, RepositoryError> {
        let row = sqlx::query_as::<_, AdminInviteRow>(&format!(
            r"
            UPDATE console.admin_invite
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missing_or_conflict(id, "invite is not pending").await),
        }
    }

    /// Remove a pending invite whose email never went out.
    ///
    /// Returns false if the invite is gone or no longer pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn withdraw_unsent(&self, id: AdminInviteId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM console.admin_invite WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete an invite that is no longer pending (accepted, cancelled or expired).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invite doesn't exist.
    /// Returns `RepositoryError::Conflict` if the invite is still pending.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete_non_pending(&self, id: AdminInviteId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM console.admin_invite
            WHERE id = $1 AND (status <> 'pending' OR expires_at <= NOW())
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict(id, "pending invites must be cancelled first").await);
        }

        Ok(())
    }

    async fn missing_or_conflict(&self, id: AdminInviteId, message: &str) -> RepositoryError {
        match self.get_by_id(id).await {
            Ok(Some(_)) => RepositoryError::Conflict(message.to_owned()),
            Ok(None) => RepositoryError::NotFound,
            Err(e) => e,
        }
    }
}
