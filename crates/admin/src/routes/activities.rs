//! Activity handlers: CRUD, QR image and geofence check.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use activity_console_core::{ActivityId, AdminPermission, NotificationKind};

use super::{Ack, ack};
use crate::db::activities::ActivityPlacement;
use crate::db::{ActivityRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::activity::valid_coordinates;
use crate::models::{Activity, ActivityFilter, ActivityInput, CurrentAdmin, actions};
use crate::services::notify::notify_department;
use crate::services::{DepartmentScope, GeoPoint, GeofenceCheck, audit, qr, tokens};
use crate::state::AppState;

/// Attempts at drawing an unused activity code.
const MAX_CODE_ATTEMPTS: usize = 8;

/// Build the activities router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/activities", get(list).post(create))
        .route(
            "/api/activities/{id}",
            get(show).put(update).delete(remove),
        )
        .route("/api/activities/{id}/toggle", post(toggle))
        .route("/api/activities/{id}/qr.svg", get(qr_svg))
        .route("/api/activities/{id}/geofence-check", post(geofence_check))
}

#[derive(Debug, Deserialize)]
pub struct GeofenceRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Load an activity and check it is inside `admin`'s scope.
async fn load_scoped(state: &AppState, admin: &CurrentAdmin, id: ActivityId) -> Result<Activity> {
    let activity = ActivityRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("activity {id}")))?;
    DepartmentScope::of(admin).ensure(&activity.department)?;
    Ok(activity)
}

/// Check-in radius to store: the requested one, else the system default.
async fn placement_for(
    state: &AppState,
    input: &ActivityInput,
    department: String,
) -> Result<ActivityPlacement> {
    let checkin_radius_m = match input.checkin_radius_m {
        Some(radius) => radius,
        None => state.system_settings().await?.default_checkin_radius_m,
    };
    Ok(ActivityPlacement {
        checkin_radius_m,
        department,
    })
}

/// GET /api/activities
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<ActivityFilter>,
) -> Result<Json<Vec<Activity>>> {
    admin.require(AdminPermission::ViewReports)?;
    let activities = ActivityRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(DepartmentScope::of(&admin).filter(
        activities,
        filter.department.as_deref(),
        |a| a.department.as_str(),
    )))
}

/// GET /api/activities/{id}
#[instrument(skip(admin, state))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
) -> Result<Json<Activity>> {
    admin.require(AdminPermission::ViewReports)?;
    Ok(Json(load_scoped(&state, &admin, id).await?))
}

/// POST /api/activities
#[instrument(skip(admin, state, input))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<ActivityInput>,
) -> Result<(StatusCode, Json<Activity>)> {
    admin.require(AdminPermission::ManageActivities)?;
    input.validate()?;

    let department = DepartmentScope::of(&admin).resolve_for_write(input.department.as_deref())?;
    let placement = placement_for(&state, &input, department).await?;
    let repo = ActivityRepository::new(state.pool());

    let mut created = None;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = tokens::generate_activity_code();
        let payload = qr::checkin_url(&state.config().base_url, &code)?;
        match repo.create(&input, &placement, &code, &payload, admin.id).await {
            Ok(activity) => {
                created = Some(activity);
                break;
            }
            Err(RepositoryError::Conflict(_)) => {
                tracing::debug!(%code, "activity code taken, drawing another");
            }
            Err(e) => return Err(e.into()),
        }
    }
    let activity = created
        .ok_or_else(|| AppError::Internal("could not allocate an activity code".to_string()))?;

    tracing::info!(activity_id = %activity.id, code = %activity.code, "activity created");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ACTIVITY_CREATE,
            "activity",
            Some(activity.id.to_string()),
            &activity.department,
            json!({ "code": activity.code, "name": activity.name }),
        ),
    )
    .await;

    notify_department(
        state.pool(),
        state.events(),
        &activity.department,
        Some(admin.id),
        NotificationKind::Info,
        "มีกิจกรรมใหม่",
        &format!("{} ({})", activity.name, activity.code),
    )
    .await;

    Ok((StatusCode::CREATED, Json(activity)))
}

/// PUT /api/activities/{id}
#[instrument(skip(admin, state, input))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
    Json(input): Json<ActivityInput>,
) -> Result<Json<Activity>> {
    admin.require(AdminPermission::ManageActivities)?;
    input.validate()?;

    let existing = load_scoped(&state, &admin, id).await?;
    let requested = input
        .department
        .as_deref()
        .unwrap_or(existing.department.as_str());
    let department = DepartmentScope::of(&admin).resolve_for_write(Some(requested))?;
    let placement = placement_for(&state, &input, department).await?;

    let activity = ActivityRepository::new(state.pool())
        .update(id, &input, &placement)
        .await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ACTIVITY_UPDATE,
            "activity",
            Some(id.to_string()),
            &activity.department,
            json!({ "code": activity.code, "previous_department": existing.department }),
        ),
    )
    .await;

    Ok(Json(activity))
}

/// POST /api/activities/{id}/toggle
#[instrument(skip(admin, state))]
async fn toggle(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
) -> Result<Json<Activity>> {
    admin.require(AdminPermission::ManageActivities)?;
    load_scoped(&state, &admin, id).await?;

    let activity = ActivityRepository::new(state.pool()).toggle_active(id).await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ACTIVITY_TOGGLE,
            "activity",
            Some(id.to_string()),
            &activity.department,
            json!({ "is_active": activity.is_active }),
        ),
    )
    .await;

    Ok(Json(activity))
}

/// DELETE /api/activities/{id}
#[instrument(skip(admin, state))]
async fn remove(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
) -> Result<Json<Ack>> {
    admin.require(AdminPermission::ManageActivities)?;
    let activity = load_scoped(&state, &admin, id).await?;

    ActivityRepository::new(state.pool()).delete(id).await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::ACTIVITY_DELETE,
            "activity",
            Some(id.to_string()),
            &activity.department,
            json!({ "code": activity.code, "name": activity.name }),
        ),
    )
    .await;

    Ok(ack())
}

/// GET /api/activities/{id}/qr.svg
#[instrument(skip(admin, state))]
async fn qr_svg(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
) -> Result<impl IntoResponse> {
    admin.require(AdminPermission::ViewReports)?;
    let activity = load_scoped(&state, &admin, id).await?;
    let svg = qr::render_svg(&activity.qr_payload)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

/// POST /api/activities/{id}/geofence-check
#[instrument(skip(admin, state, body))]
async fn geofence_check(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
    Json(body): Json<GeofenceRequest>,
) -> Result<Json<GeofenceCheck>> {
    admin.require(AdminPermission::ViewReports)?;
    if !valid_coordinates(body.latitude, body.longitude) {
        return Err(AppError::BadRequest("coordinates are out of range".to_string()));
    }
    let activity = load_scoped(&state, &admin, id).await?;

    Ok(Json(GeofenceCheck::evaluate(
        GeoPoint::new(activity.latitude, activity.longitude),
        GeoPoint::new(body.latitude, body.longitude),
        f64::from(activity.checkin_radius_m),
    )))
}
