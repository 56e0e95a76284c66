//! In-console notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use activity_console_core::{AdminUserId, NotificationId, NotificationKind};

/// A notification addressed to one admin.
#[derive(Debug, Clone, Serialize)]
pub struct AdminNotification {
    pub id: NotificationId,
    pub recipient_id: AdminUserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be inserted.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: AdminUserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}
