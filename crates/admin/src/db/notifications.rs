//! Per-admin notification repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use activity_console_core::{AdminUserId, NotificationId, NotificationKind, StatusError};

use super::RepositoryError;
use crate::models::{AdminNotification, NewNotification};

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, title, message, kind, is_read, created_at";

/// Most recent notifications returned to the console.
pub const LIST_LIMIT: i64 = 100;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i32,
    recipient_id: i32,
    title: String,
    message: String,
    kind: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for AdminNotification {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind: NotificationKind = row.kind.parse().map_err(|e: StatusError| {
            RepositoryError::DataCorruption(format!("notification {}: {e}", row.id))
        })?;
        Ok(Self {
            id: NotificationId::new(row.id),
            recipient_id: AdminUserId::new(row.recipient_id),
            title: row.title,
            message: row.message,
            kind,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

/// Repository for admin notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<AdminNotification, RepositoryError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r"
            INSERT INTO console.admin_notification (recipient_id, title, message, kind)
            VALUES ($1, $2, $3, $4)
            RETURNING {NOTIFICATION_COLUMNS}
            "
        ))
        .bind(notification.recipient_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Newest notifications for one admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(
        &self,
        recipient: AdminUserId,
    ) -> Result<Vec<AdminNotification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r"
            SELECT {NOTIFICATION_COLUMNS} FROM console.admin_notification
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "
        ))
        .bind(recipient)
        .bind(LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Number of unread notifications for one admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, recipient: AdminUserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM console.admin_notification WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Mark one notification read. Only the recipient may do this.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such notification belongs to `recipient`.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        recipient: AdminUserId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE console.admin_notification
            SET is_read = TRUE
            WHERE id = $1 AND recipient_id = $2
            ",
        )
        .bind(id)
        .bind(recipient)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark every notification of `recipient` read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, recipient: AdminUserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE console.admin_notification SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
