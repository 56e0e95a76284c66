//! Audit trail helpers.
//!
//! Writing an entry never fails the request that triggered it; a failed
//! insert is logged and swallowed.

use serde_json::Value;
use sqlx::PgPool;

use crate::db::AdminLogRepository;
use crate::models::{CurrentAdmin, NewLogEntry};

/// Build an entry attributed to `actor`.
#[must_use]
pub fn entry(
    actor: &CurrentAdmin,
    action: &'static str,
    target_type: &'static str,
    target_id: Option<String>,
    department: &str,
    details: Value,
) -> NewLogEntry {
    NewLogEntry {
        actor_id: Some(actor.id),
        actor_email: actor.email.as_str().to_owned(),
        action,
        target_type,
        target_id,
        department: department.to_owned(),
        details,
    }
}

/// Persist an audit entry.
pub async fn record(pool: &PgPool, entry: NewLogEntry) {
    match AdminLogRepository::new(pool).insert(&entry).await {
        Ok(id) => tracing::debug!(log_id = %id, action = entry.action, "audit entry written"),
        Err(e) => tracing::warn!(
            action = entry.action,
            target_type = entry.target_type,
            error = %e,
            "failed to write audit entry"
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use activity_console_core::{AdminDepartment, AdminRole, AdminUserId, Email};

    use super::*;
    use crate::models::actions;

    #[test]
    fn test_entry_attributes_actor() {
        let actor = CurrentAdmin {
            id: AdminUserId::new(4),
            email: Email::parse("dean@uni.ac.th").unwrap(),
            display_name: "Dean".to_string(),
            role: AdminRole::DepartmentAdmin,
            department: AdminDepartment::Science,
            permissions: Vec::new(),
        };
        let e = entry(
            &actor,
            actions::STUDENT_DELETE,
            "student",
            Some("12".to_string()),
            "science",
            serde_json::json!({"student_code": "6400001"}),
        );
        assert_eq!(e.actor_id, Some(AdminUserId::new(4)));
        assert_eq!(e.actor_email, "dean@uni.ac.th");
        assert_eq!(e.action, "student.delete");
        assert_eq!(e.department, "science");
    }
}
