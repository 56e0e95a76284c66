//! Attendance record handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use activity_console_core::AdminPermission;

use crate::db::{ActivityRecordRepository, RepositoryError};
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::{
    ActivityRecord, BulkDeleteOutcome, BulkDeleteRequest, CurrentAdmin, RecordFilter, actions,
    bangkok,
};
use crate::services::bulk::{self, Lookup};
use crate::services::{DepartmentScope, Paging, audit, export};
use crate::state::AppState;

/// Build the records router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/records", get(list))
        .route("/api/records/export", get(export_csv))
        .route("/api/records/bulk-delete", post(bulk_delete))
}

/// Most rows the list endpoint returns; exports are not capped.
const LIST_LIMIT: usize = 10_000;

/// Records matching `filter` that `admin` may see, newest first.
async fn scoped_records(
    state: &AppState,
    admin: &CurrentAdmin,
    filter: &RecordFilter,
    paging: Paging,
) -> Result<Vec<ActivityRecord>> {
    let repo = ActivityRecordRepository::new(state.pool());
    let records = DepartmentScope::of(admin)
        .collect_pages(
            filter.department.as_deref(),
            paging,
            |r: &ActivityRecord| r.department.as_str(),
            |r| (r.checked_in_at, r.id),
            |after, size| repo.list_page(filter, after, size),
        )
        .await?;
    Ok(records)
}

/// GET /api/records
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Result<Json<Vec<ActivityRecord>>> {
    admin.require(AdminPermission::ViewReports)?;
    Ok(Json(
        scoped_records(&state, &admin, &filter, Paging::up_to(LIST_LIMIT)).await?,
    ))
}

/// GET /api/records/export
#[instrument(skip(admin, state))]
async fn export_csv(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Result<impl IntoResponse> {
    admin.require(AdminPermission::ExportData)?;

    let records = scoped_records(&state, &admin, &filter, Paging::all()).await?;
    let body = export::records_to_csv(&records)?;
    let filename = export::export_filename(Utc::now().with_timezone(&bangkok()).date_naive());

    tracing::info!(rows = records.len(), %filename, "attendance exported");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::RECORD_EXPORT,
            "activity_record",
            None,
            admin.department.key(),
            json!({
                "rows": records.len(),
                "activity_code": filter.activity_code,
                "department": filter.department,
                "from": filter.from,
                "to": filter.to,
            }),
        ),
    )
    .await;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

/// POST /api/records/bulk-delete
///
/// Ids are processed one at a time; missing or out-of-scope records are
/// skipped rather than failing the batch. If the store fails partway, the
/// deletes already done are still audited and reported, and the remaining
/// ids come back as `failed`.
#[instrument(skip(admin, state, body))]
async fn bulk_delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteOutcome>> {
    admin.require(AdminPermission::ManageActivities)?;

    let repo = ActivityRecordRepository::new(state.pool());
    let scope = DepartmentScope::of(&admin);
    let (repo, scope) = (&repo, &scope);

    let run = bulk::delete_each(
        body.ids,
        |id| async move {
            let lookup = match repo.get_by_id(id).await? {
                None => Lookup::Missing,
                Some(record) if !scope.allows(&record.department) => {
                    tracing::info!(record_id = %id, department = %record.department, "record outside scope, skipped");
                    Lookup::OutOfScope
                }
                Some(_) => Lookup::Deletable,
            };
            Ok::<_, RepositoryError>(lookup)
        },
        |id| repo.delete(id),
    )
    .await;

    if let Some(e) = &run.error {
        tracing::error!(error = %e, failed = run.outcome.failed, "bulk delete stopped early");
    }

    if run.outcome.deleted > 0 {
        audit::record(
            state.pool(),
            audit::entry(
                &admin,
                actions::RECORD_DELETE,
                "activity_record",
                None,
                admin.department.key(),
                json!({
                    "ids": run.deleted_ids,
                    "skipped": run.outcome.skipped,
                    "failed": run.outcome.failed,
                }),
            ),
        )
        .await;
    }

    Ok(Json(run.outcome))
}
