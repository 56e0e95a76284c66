//! Attendance record repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use activity_console_core::ActivityRecordId;

use super::{RepositoryError, like_pattern};
use crate::models::{ActivityRecord, NewActivityRecord, RecordFilter};

const RECORD_COLUMNS: &str = "id, activity_code, activity_name, student_id, student_name, \
     department, major, location, latitude, longitude, checked_in_at";

/// Position after which the next page starts: the last row's check-in time and id.
pub type RecordCursor = (DateTime<Utc>, ActivityRecordId);

/// Result of [`ActivityRecordRepository::insert_within_capacity`].
#[derive(Debug)]
pub enum CheckInInsert {
    Recorded(ActivityRecord),
    /// The activity already has `max_participants` check-ins.
    Full,
}

/// Whether one more check-in fits.
fn has_room(taken: i64, capacity: i32) -> bool {
    taken < i64::from(capacity)
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: i32,
    activity_code: String,
    activity_name: String,
    student_id: String,
    student_name: String,
    department: String,
    major: String,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    checked_in_at: DateTime<Utc>,
}

impl From<RecordRow> for ActivityRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: ActivityRecordId::new(row.id),
            activity_code: row.activity_code,
            activity_name: row.activity_name,
            student_id: row.student_id,
            student_name: row.student_name,
            department: row.department,
            major: row.major,
            location: row.location,
            latitude: row.latitude,
            longitude: row.longitude,
            checked_in_at: row.checked_in_at,
        }
    }
}

/// Repository for attendance records.
pub struct ActivityRecordRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRecordRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of records matching the activity, date and search filters,
    /// newest first, starting after `after`.
    ///
    /// The department filter is applied by the caller together with the
    /// viewer's scope, see `DepartmentScope::collect_pages`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(
        &self,
        filter: &RecordFilter,
        after: Option<RecordCursor>,
        page_size: usize,
    ) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {RECORD_COLUMNS} FROM console.activity_record WHERE TRUE"
        ));

        if let Some(code) = filter
            .activity_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            qb.push(" AND activity_code = ").push_bind(code.to_ascii_uppercase());
        }
        let (from, to) = filter.utc_range();
        if let Some(from) = from {
            qb.push(" AND checked_in_at >= ").push_bind(from);
        }
        if let Some(to) = to {
            qb.push(" AND checked_in_at < ").push_bind(to);
        }
        if let Some(term) = filter.search_term() {
            let pattern = like_pattern(term);
            qb.push(" AND (student_id ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR student_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some((at, id)) = after {
            qb.push(" AND (checked_in_at, id) < (")
                .push_bind(at)
                .push(", ")
                .push_bind(id)
                .push(")");
        }
        qb.push(" ORDER BY checked_in_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(page_size).unwrap_or(i64::MAX));

        let rows = qb.build_query_as::<RecordRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(ActivityRecord::from).collect())
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: ActivityRecordId,
    ) -> Result<Option<ActivityRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM console.activity_record WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ActivityRecord::from))
    }

    /// Insert an attendance record unless the activity is at `capacity`.
    ///
    /// With a capacity the activity row is locked for the count and insert,
    /// so concurrent check-ins to the same activity cannot overfill it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the student already checked in.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_within_capacity(
        &self,
        record: &NewActivityRecord,
        capacity: Option<i32>,
    ) -> Result<CheckInInsert, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(capacity) = capacity {
            sqlx::query("SELECT 1 FROM console.activity WHERE code = $1 FOR UPDATE")
                .bind(&record.activity_code)
                .fetch_optional(&mut *tx)
                .await?;
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM console.activity_record WHERE activity_code = $1",
            )
            .bind(&record.activity_code)
            .fetch_one(&mut *tx)
            .await?;
            if !has_room(taken, capacity) {
                return Ok(CheckInInsert::Full);
            }
        }

        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r"
            INSERT INTO console.activity_record
                (activity_code, activity_name, student_id, student_name, department,
                 major, location, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RECORD_COLUMNS}
            "
        ))
        .bind(&record.activity_code)
        .bind(&record.activity_name)
        .bind(&record.student_id)
        .bind(&record.student_name)
        .bind(&record.department)
        .bind(&record.major)
        .bind(&record.location)
        .bind(record.latitude)
        .bind(record.longitude)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "student already checked in"))?;

        tx.commit().await?;
        Ok(CheckInInsert::Recorded(row.into()))
    }

    /// Delete a record. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ActivityRecordId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM console.activity_record WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
