//! Audit log entries written by every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use activity_console_core::{AdminLogId, AdminUserId};

/// One logged admin action.
#[derive(Debug, Clone, Serialize)]
pub struct AdminLogEntry {
    pub id: AdminLogId,
    pub actor_id: Option<AdminUserId>,
    pub actor_email: String,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub department: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Entry about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub actor_id: Option<AdminUserId>,
    pub actor_email: String,
    pub action: &'static str,
    pub target_type: &'static str,
    pub target_id: Option<String>,
    pub department: String,
    pub details: serde_json::Value,
}

/// Filters for `GET /api/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    pub action: Option<String>,
    pub actor: Option<String>,
    pub limit: Option<i64>,
}

impl LogFilter {
    pub const DEFAULT_LIMIT: usize = 200;
    pub const MAX_LIMIT: usize = 1000;

    /// Entries to return, counted after department scoping.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.map_or(Self::DEFAULT_LIMIT, |requested| {
            usize::try_from(requested.max(1))
                .unwrap_or(Self::MAX_LIMIT)
                .min(Self::MAX_LIMIT)
        })
    }
}

/// Action names recorded in the log.
pub mod actions {
    pub const LOGIN: &str = "auth.login";
    pub const LOGOUT: &str = "auth.logout";
    pub const RECORD_DELETE: &str = "record.delete";
    pub const RECORD_EXPORT: &str = "record.export";
    pub const ACTIVITY_CREATE: &str = "activity.create";
    pub const ACTIVITY_UPDATE: &str = "activity.update";
    pub const ACTIVITY_TOGGLE: &str = "activity.toggle";
    pub const ACTIVITY_DELETE: &str = "activity.delete";
    pub const INVITE_SEND: &str = "invite.send";
    pub const INVITE_CANCEL: &str = "invite.cancel";
    pub const INVITE_DELETE: &str = "invite.delete";
    pub const INVITE_ACCEPT: &str = "invite.accept";
    pub const ADMIN_UPDATE: &str = "admin.update";
    pub const ADMIN_RESET_PERMISSIONS: &str = "admin.reset_permissions";
    pub const ADMIN_REVOKE: &str = "admin.revoke";
    pub const ADMIN_PROMOTE: &str = "admin.promote";
    pub const PROFILE_UPDATE: &str = "profile.update";
    pub const STUDENT_CREATE: &str = "student.create";
    pub const STUDENT_UPDATE: &str = "student.update";
    pub const STUDENT_DELETE: &str = "student.delete";
    pub const SETTINGS_UPDATE: &str = "settings.update";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(LogFilter::default().limit(), LogFilter::DEFAULT_LIMIT);
        let huge = LogFilter {
            limit: Some(1_000_000),
            ..LogFilter::default()
        };
        assert_eq!(huge.limit(), LogFilter::MAX_LIMIT);
        let negative = LogFilter {
            limit: Some(-5),
            ..LogFilter::default()
        };
        assert_eq!(negative.limit(), 1);
    }
}
