//! Audit log handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use tracing::instrument;

use activity_console_core::AdminPermission;

use crate::db::AdminLogRepository;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::{AdminLogEntry, LogFilter};
use crate::services::{DepartmentScope, Paging};
use crate::state::AppState;

/// Build the logs router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/logs", get(list))
}

/// GET /api/logs
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> Result<Json<Vec<AdminLogEntry>>> {
    admin.require(AdminPermission::ViewReports)?;
    let repo = AdminLogRepository::new(state.pool());
    let entries = DepartmentScope::of(&admin)
        .collect_pages(
            None,
            Paging::up_to(filter.limit()),
            |e: &AdminLogEntry| e.department.as_str(),
            |e| (e.created_at, e.id),
            |after, size| repo.list_page(&filter, after, size),
        )
        .await?;
    Ok(Json(entries))
}
