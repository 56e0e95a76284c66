//! Student repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use activity_console_core::StudentId;

use super::{RepositoryError, like_pattern};
use crate::models::{Student, StudentFilter, StudentInput};

const STUDENT_COLUMNS: &str = "id, student_code, first_name, last_name, email, department, \
     major, year, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct StudentRow {
    id: i32,
    student_code: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    department: String,
    major: String,
    year: Option<i16>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: StudentId::new(row.id),
            student_code: row.student_code,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            department: row.department,
            major: row.major,
            year: row.year,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for student records.
pub struct StudentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StudentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List students matching the search and active filters.
    ///
    /// Department filtering is left to the caller so legacy labels compare
    /// equal to their keys.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM console.student WHERE TRUE"));

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(term);
            qb.push(" AND (student_code ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(active) = filter.active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        qb.push(" ORDER BY student_code");

        let rows = qb.build_query_as::<StudentRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    /// Get a student by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM console.student WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Student::from))
    }

    /// Get a student by their university code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, student_code: &str) -> Result<Option<Student>, RepositoryError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM console.student WHERE student_code = $1"
        ))
        .bind(student_code.trim())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Student::from))
    }

    /// Get a student by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Student>, RepositoryError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM console.student WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Student::from))
    }

    /// Create a student in `department` (already normalised by the caller).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the student code is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        input: &StudentInput,
        department: &str,
    ) -> Result<Student, RepositoryError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            r"
            INSERT INTO console.student
                (student_code, first_name, last_name, email, department, major, year, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {STUDENT_COLUMNS}
            "
        ))
        .bind(input.student_code.trim())
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()))
        .bind(department)
        .bind(input.major.trim())
        .bind(input.year)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "student code already exists"))?;

        Ok(row.into())
    }

    /// Replace a student's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the student doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new student code is taken.
    pub async fn update(
        &self,
        id: StudentId,
        input: &StudentInput,
        department: &str,
    ) -> Result<Student, RepositoryError> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            r"
            UPDATE console.student
            SET student_code = $2, first_name = $3, last_name = $4, email = $5,
                department = $6, major = $7, year = $8, is_active = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {STUDENT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.student_code.trim())
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()))
        .bind(department)
        .bind(input.major.trim())
        .bind(input.year)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "student code already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a student.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the student doesn't exist.
    pub async fn delete(&self, id: StudentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM console.student WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
