//! Admin user management handlers.
//!
//! Every change runs through the grant rules in [`crate::services::grants`]
//! before anything is written.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use activity_console_core::{AdminPermission, AdminRole, AdminUserId, Email, NotificationKind};

use super::{Ack, ack};
use crate::db::{AdminUserRepository, StudentRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{AdminAccessUpdate, AdminProfile, CurrentAdmin, NewAdmin, actions};
use crate::services::grants::{check_edit_target, check_grant, plan_access_update};
use crate::services::notify::notify_admin;
use crate::services::{DepartmentScope, GrantRequest, audit};
use crate::state::AppState;

/// Build the admin users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin-users", get(list))
        .route("/api/admin-users/promote", post(promote))
        .route(
            "/api/admin-users/{id}",
            get(show).patch(update).delete(revoke),
        )
        .route(
            "/api/admin-users/{id}/permissions/reset",
            post(reset_permissions),
        )
}

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub email: String,
    pub role: Option<AdminRole>,
    pub department: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<AdminPermission>>,
}

async fn load_target(state: &AppState, id: AdminUserId) -> Result<AdminProfile> {
    AdminUserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("admin {id}")))
}

/// Load an admin the actor may see: themselves, or one inside their scope.
async fn load_visible(state: &AppState, admin: &CurrentAdmin, id: AdminUserId) -> Result<AdminProfile> {
    if id == admin.id {
        return load_target(state, id).await;
    }
    admin.require(AdminPermission::ManageAdmins)?;
    let target = load_target(state, id).await?;
    if !DepartmentScope::of(admin).covers(target.department) {
        return Err(AppError::NotFound(format!("admin {id}")));
    }
    Ok(target)
}

/// GET /api/admin-users
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminProfile>>> {
    admin.require(AdminPermission::ManageAdmins)?;
    let scope = DepartmentScope::of(&admin);

    let admins = AdminUserRepository::new(state.pool())
        .list_all()
        .await?
        .into_iter()
        .filter(|a| scope.covers(a.department))
        .collect();

    Ok(Json(admins))
}

/// GET /api/admin-users/{id}
#[instrument(skip(admin, state))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<Json<AdminProfile>> {
    Ok(Json(load_visible(&state, &admin, id).await?))
}

/// PATCH /api/admin-users/{id}
#[instrument(skip(admin, state, update))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
    Json(update): Json<AdminAccessUpdate>,
) -> Result<Json<AdminProfile>> {
    if update.is_empty() {
        return Err(AppError::BadRequest("nothing to update".to_string()));
    }

    let target = load_target(&state, id).await?;
    let plan = plan_access_update(&admin, &target, &update)?;

    let updated = AdminUserRepository::new(state.pool())
        .update_access(
            id,
            plan.role,
            plan.department,
            plan.permissions.as_deref(),
            plan.is_active,
        )
        .await?;

    tracing::info!(
        admin_id = %id,
        role = %updated.role,
        department = updated.department.key(),
        is_active = updated.is_active,
        "admin access updated"
    );

    notify_admin(
        state.pool(),
        state.events(),
        id,
        NotificationKind::AdminChanged,
        "สิทธิ์ของคุณมีการเปลี่ยนแปลง",
        &format!("{} updated your access", admin.display_name),
    )
    .await;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ADMIN_UPDATE,
            "admin_user",
            Some(id.to_string()),
            updated.department.key(),
            json!({
                "before": {
                    "role": target.role,
                    "department": target.department,
                    "permissions": target.permissions,
                    "is_active": target.is_active,
                },
                "after": {
                    "role": updated.role,
                    "department": updated.department,
                    "permissions": updated.permissions,
                    "is_active": updated.is_active,
                },
            }),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// POST /api/admin-users/{id}/permissions/reset
#[instrument(skip(admin, state))]
async fn reset_permissions(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<Json<AdminProfile>> {
    let target = load_target(&state, id).await?;
    check_edit_target(&admin, &target)?;

    let updated = AdminUserRepository::new(state.pool())
        .reset_permissions(id)
        .await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ADMIN_RESET_PERMISSIONS,
            "admin_user",
            Some(id.to_string()),
            updated.department.key(),
            json!({ "previous": target.permissions, "role": updated.role }),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Revoke admin status. The row stays for the audit trail.
///
/// DELETE /api/admin-users/{id}
#[instrument(skip(admin, state))]
async fn revoke(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<Json<Ack>> {
    let target = load_target(&state, id).await?;
    check_edit_target(&admin, &target)?;

    AdminUserRepository::new(state.pool()).revoke(id).await?;

    tracing::info!(admin_id = %id, email = %target.email, "admin revoked");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ADMIN_REVOKE,
            "admin_user",
            Some(id.to_string()),
            target.department.key(),
            json!({ "email": target.email, "role": target.role }),
        ),
    )
    .await;

    Ok(ack())
}

/// Turn a student's email into an admin account.
///
/// POST /api/admin-users/promote
#[instrument(skip(admin, state, body))]
async fn promote(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<PromoteRequest>,
) -> Result<(StatusCode, Json<AdminProfile>)> {
    let grant = check_grant(
        &admin,
        &GrantRequest {
            role: body.role,
            department: body.department.as_deref(),
            permissions: body.permissions.as_deref(),
        },
    )?;

    let email = Email::parse_normalized(&body.email)
        .map_err(|_| AppError::BadRequest("อีเมลไม่ถูกต้อง (invalid email)".to_string()))?;
    let student = StudentRepository::new(state.pool())
        .get_by_email(email.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no student with email {email}")))?;

    let users = AdminUserRepository::new(state.pool());
    if users.email_exists(&email).await? {
        return Err(AppError::Conflict(
            "อีเมลนี้เป็นผู้ดูแลอยู่แล้ว (email is already an admin)".to_string(),
        ));
    }

    let created = users
        .create(&NewAdmin {
            email,
            display_name: student.full_name(),
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            role: grant.role,
            department: grant.department,
            permissions: grant.permissions,
            created_by: Some(admin.id),
        })
        .await?;

    tracing::info!(admin_id = %created.id, student_code = %student.student_code, "student promoted to admin");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ADMIN_PROMOTE,
            "admin_user",
            Some(created.id.to_string()),
            created.department.key(),
            json!({
                "email": created.email,
                "student_code": student.student_code,
                "role": created.role,
            }),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}
