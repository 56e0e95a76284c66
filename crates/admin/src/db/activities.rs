//! Activity repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use activity_console_core::{ActivityId, AdminUserId};

use super::{RepositoryError, like_pattern};
use crate::models::{Activity, ActivityFilter, ActivityInput};

const ACTIVITY_COLUMNS: &str = "id, code, name, description, location_name, latitude, longitude, \
     checkin_radius_m, start_time, end_time, max_participants, department, is_active, \
     require_location, qr_payload, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: i32,
    code: String,
    name: String,
    description: String,
    location_name: String,
    latitude: f64,
    longitude: f64,
    checkin_radius_m: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_participants: Option<i32>,
    department: String,
    is_active: bool,
    require_location: bool,
    qr_payload: String,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: ActivityId::new(row.id),
            code: row.code,
            name: row.name,
            description: row.description,
            location_name: row.location_name,
            latitude: row.latitude,
            longitude: row.longitude,
            checkin_radius_m: row.checkin_radius_m,
            start_time: row.start_time,
            end_time: row.end_time,
            max_participants: row.max_participants,
            department: row.department,
            is_active: row.is_active,
            require_location: row.require_location,
            qr_payload: row.qr_payload,
            created_by: row.created_by.map(AdminUserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Server-side fields stored alongside a validated [`ActivityInput`].
#[derive(Debug, Clone)]
pub struct ActivityPlacement {
    pub checkin_radius_m: i32,
    /// Normalised department key.
    pub department: String,
}

/// Repository for activity database operations.
pub struct ActivityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List activities, newest start time first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {ACTIVITY_COLUMNS} FROM console.activity WHERE TRUE"
        ));

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR code ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR location_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(active) = filter.active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        qb.push(" ORDER BY start_time DESC");

        let rows = qb.build_query_as::<ActivityRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    /// Get an activity by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ActivityId) -> Result<Option<Activity>, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM console.activity WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Activity::from))
    }

    /// Get an activity by its check-in code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Activity>, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM console.activity WHERE code = $1"
        ))
        .bind(code.trim().to_ascii_uppercase())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Activity::from))
    }

    /// Insert an activity under `code`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        input: &ActivityInput,
        placement: &ActivityPlacement,
        code: &str,
        qr_payload: &str,
        created_by: AdminUserId,
    ) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            r"
            INSERT INTO console.activity
                (code, name, description, location_name, latitude, longitude,
                 checkin_radius_m, start_time, end_time, max_participants, department,
                 require_location, qr_payload, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {ACTIVITY_COLUMNS}
            "
        ))
        .bind(code)
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.location_name.trim())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(placement.checkin_radius_m)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.max_participants)
        .bind(&placement.department)
        .bind(input.require_location)
        .bind(qr_payload)
        .bind(created_by)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "activity code already exists"))?;

        Ok(row.into())
    }

    /// Replace the editable fields of an activity. The code and QR payload stay.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity doesn't exist.
    pub async fn update(
        &self,
        id: ActivityId,
        input: &ActivityInput,
        placement: &ActivityPlacement,
    ) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            r"
            UPDATE console.activity
            SET name = $2, description = $3, location_name = $4, latitude = $5,
                longitude = $6, checkin_radius_m = $7, start_time = $8, end_time = $9,
                max_participants = $10, department = $11, require_location = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ACTIVITY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.location_name.trim())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(placement.checkin_radius_m)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.max_participants)
        .bind(&placement.department)
        .bind(input.require_location)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Flip `is_active`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity doesn't exist.
    pub async fn toggle_active(&self, id: ActivityId) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            r"
            UPDATE console.activity
            SET is_active = NOT is_active, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACTIVITY_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an activity. Attendance records keep their copied fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the activity doesn't exist.
    pub async fn delete(&self, id: ActivityId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM console.activity WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
