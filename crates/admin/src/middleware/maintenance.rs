//! Maintenance mode gate for the JSON API.
//!
//! While maintenance is enabled, `/api/*` requests are answered with 503.
//! Sign-in routes stay open so a super admin can get in and switch it off.
//! Super admins always pass; other signed-in admins pass only when the
//! bypass flag is set.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::auth::session_admin;
use crate::error::AppError;
use crate::models::{CurrentAdmin, MaintenanceSettings};
use crate::state::AppState;

/// Returns true for paths the gate never blocks.
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    !path.starts_with("/api/") || path.starts_with("/api/auth/")
}

/// Whether `admin` may use the API under `maintenance`.
#[must_use]
pub fn maintenance_allows(maintenance: &MaintenanceSettings, admin: Option<&CurrentAdmin>) -> bool {
    if !maintenance.enabled {
        return true;
    }
    match admin {
        Some(admin) if admin.is_super_admin() => true,
        Some(_) => maintenance.allow_admin_bypass,
        None => false,
    }
}

/// Middleware applying the maintenance gate.
pub async fn maintenance_gate(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let settings = match state.system_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "could not load settings for maintenance check");
            return next.run(request).await;
        }
    };

    if !settings.maintenance.enabled {
        return next.run(request).await;
    }

    let admin = session_admin(&session).await;
    if maintenance_allows(&settings.maintenance, admin.as_ref()) {
        next.run(request).await
    } else {
        AppError::Unavailable(settings.maintenance.message).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use activity_console_core::{AdminDepartment, AdminRole, AdminUserId, Email};

    use super::*;

    fn admin(role: AdminRole) -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(1),
            email: Email::parse("staff@uni.ac.th").unwrap(),
            display_name: "Staff".to_string(),
            role,
            department: AdminDepartment::Science,
            permissions: role.default_permissions().to_vec(),
        }
    }

    fn maintenance(enabled: bool, bypass: bool) -> MaintenanceSettings {
        MaintenanceSettings {
            enabled,
            allow_admin_bypass: bypass,
            ..MaintenanceSettings::default()
        }
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/api/auth/login/send-code"));
        assert!(!is_exempt("/api/records"));
        assert!(!is_exempt("/api/checkin"));
    }

    #[test]
    fn test_disabled_allows_everyone() {
        assert!(maintenance_allows(&maintenance(false, false), None));
    }

    #[test]
    fn test_super_admin_always_passes() {
        let m = maintenance(true, false);
        assert!(maintenance_allows(&m, Some(&admin(AdminRole::SuperAdmin))));
        assert!(!maintenance_allows(&m, Some(&admin(AdminRole::DepartmentAdmin))));
        assert!(!maintenance_allows(&m, None));
    }

    #[test]
    fn test_bypass_lets_admins_through_but_not_anonymous() {
        let m = maintenance(true, true);
        assert!(maintenance_allows(&m, Some(&admin(AdminRole::Viewer))));
        assert!(!maintenance_allows(&m, None));
    }
}
