//! Audit log repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use activity_console_core::{AdminLogId, AdminUserId};

use super::{RepositoryError, like_pattern};
use crate::models::{AdminLogEntry, LogFilter, NewLogEntry};

/// Position after which the next page starts: the last entry's time and id.
pub type LogCursor = (DateTime<Utc>, AdminLogId);

#[derive(Debug, sqlx::FromRow)]
struct AdminLogRow {
    id: i32,
    actor_id: Option<i32>,
    actor_email: String,
    action: String,
    target_type: String,
    target_id: Option<String>,
    department: String,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<AdminLogRow> for AdminLogEntry {
    fn from(row: AdminLogRow) -> Self {
        Self {
            id: AdminLogId::new(row.id),
            actor_id: row.actor_id.map(AdminUserId::new),
            actor_email: row.actor_email,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            department: row.department,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

/// Repository for the admin audit log.
pub struct AdminLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, entry: &NewLogEntry) -> Result<AdminLogId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO console.admin_log
                (actor_id, actor_email, action, target_type, target_id, department, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(entry.actor_id)
        .bind(&entry.actor_email)
        .bind(entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id.as_deref())
        .bind(&entry.department)
        .bind(&entry.details)
        .fetch_one(self.pool)
        .await?;

        Ok(AdminLogId::new(id))
    }

    /// One page of entries, newest first, filtered by action prefix and actor
    /// email and starting after `after`. The row limit is `page_size`, not
    /// `filter.limit()`, which applies after scoping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(
        &self,
        filter: &LogFilter,
        after: Option<LogCursor>,
        page_size: usize,
    ) -> Result<Vec<AdminLogEntry>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, actor_id, actor_email, action, target_type, target_id, department, \
             details, created_at FROM console.admin_log WHERE TRUE",
        );

        if let Some(action) = filter.action.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            // "invite" matches every invite.* action.
            if action.contains('.') {
                qb.push(" AND action = ").push_bind(action.to_owned());
            } else {
                qb.push(" AND action LIKE ").push_bind(format!("{action}.%"));
            }
        }
        if let Some(actor) = filter.actor.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            qb.push(" AND actor_email ILIKE ").push_bind(like_pattern(actor));
        }
        if let Some((at, id)) = after {
            qb.push(" AND (created_at, id) < (")
                .push_bind(at)
                .push(", ")
                .push_bind(id)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(page_size).unwrap_or(i64::MAX));

        let rows = qb.build_query_as::<AdminLogRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(AdminLogEntry::from).collect())
    }
}
