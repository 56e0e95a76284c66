//! Student management handlers (`manage_users`).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde_json::json;
use tracing::instrument;

use activity_console_core::{AdminPermission, StudentId};

use super::{Ack, ack};
use crate::db::StudentRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Student, StudentFilter, StudentInput, actions};
use crate::services::{DepartmentScope, audit};
use crate::state::AppState;

/// Build the students router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(list).post(create))
        .route(
            "/api/students/{id}",
            get(show).put(update).delete(remove),
        )
}

async fn load_scoped(state: &AppState, admin: &CurrentAdmin, id: StudentId) -> Result<Student> {
    let student = StudentRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("student {id}")))?;
    DepartmentScope::of(admin).ensure(&student.department)?;
    Ok(student)
}

/// GET /api/students
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<StudentFilter>,
) -> Result<Json<Vec<Student>>> {
    admin.require(AdminPermission::ManageUsers)?;
    let students = StudentRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(DepartmentScope::of(&admin).filter(
        students,
        filter.department.as_deref(),
        |s| s.department.as_str(),
    )))
}

/// GET /api/students/{id}
#[instrument(skip(admin, state))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
) -> Result<Json<Student>> {
    admin.require(AdminPermission::ManageUsers)?;
    Ok(Json(load_scoped(&state, &admin, id).await?))
}

/// POST /api/students
#[instrument(skip(admin, state, input))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<StudentInput>,
) -> Result<(StatusCode, Json<Student>)> {
    admin.require(AdminPermission::ManageUsers)?;
    input.validate().map_err(AppError::BadRequest)?;
    let department = DepartmentScope::of(&admin).resolve_for_write(input.department.as_deref())?;

    let student = StudentRepository::new(state.pool())
        .create(&input, &department)
        .await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::STUDENT_CREATE,
            "student",
            Some(student.id.to_string()),
            &student.department,
            json!({ "student_code": student.student_code }),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/{id}
#[instrument(skip(admin, state, input))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
    Json(input): Json<StudentInput>,
) -> Result<Json<Student>> {
    admin.require(AdminPermission::ManageUsers)?;
    input.validate().map_err(AppError::BadRequest)?;

    let existing = load_scoped(&state, &admin, id).await?;
    let requested = input
        .department
        .as_deref()
        .unwrap_or(existing.department.as_str());
    let department = DepartmentScope::of(&admin).resolve_for_write(Some(requested))?;

    let student = StudentRepository::new(state.pool())
        .update(id, &input, &department)
        .await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::STUDENT_UPDATE,
            "student",
            Some(id.to_string()),
            &student.department,
            json!({ "student_code": student.student_code }),
        ),
    )
    .await;

    Ok(Json(student))
}

/// DELETE /api/students/{id}
#[instrument(skip(admin, state))]
async fn remove(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<StudentId>,
) -> Result<Json<Ack>> {
    admin.require(AdminPermission::ManageUsers)?;
    let student = load_scoped(&state, &admin, id).await?;

    StudentRepository::new(state.pool()).delete(id).await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::STUDENT_DELETE,
            "student",
            Some(id.to_string()),
            &student.department,
            json!({ "student_code": student.student_code }),
        ),
    )
    .await;

    Ok(ack())
}
