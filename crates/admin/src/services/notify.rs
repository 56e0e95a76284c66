//! In-console notifications.
//!
//! Notifications are always stored per recipient; a department broadcast
//! inserts one row for each active admin whose scope covers the department.
//! Delivery is best-effort and never fails the calling request.

use sqlx::PgPool;

use activity_console_core::{AdminUserId, NotificationKind, dept_equals};

use super::events::{EventHub, LiveEvent};
use crate::db::{AdminUserRepository, NotificationRepository};
use crate::models::NewNotification;

/// Notify one admin.
pub async fn notify_admin(
    pool: &PgPool,
    events: &EventHub,
    recipient_id: AdminUserId,
    kind: NotificationKind,
    title: &str,
    message: &str,
) {
    let new = NewNotification {
        recipient_id,
        title: title.to_owned(),
        message: message.to_owned(),
        kind,
    };
    match NotificationRepository::new(pool).create(&new).await {
        Ok(created) => {
            events.publish(LiveEvent::NotificationCreated {
                recipient_id,
                notification_id: created.id,
                title: created.title,
            });
        }
        Err(e) => {
            tracing::warn!(recipient = %recipient_id, error = %e, "failed to store notification");
        }
    }
}

/// Notify every active admin covering `department`, except `skip`.
///
/// Returns the number of notifications stored.
pub async fn notify_department(
    pool: &PgPool,
    events: &EventHub,
    department: &str,
    skip: Option<AdminUserId>,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> usize {
    let admins = match AdminUserRepository::new(pool).list_all().await {
        Ok(admins) => admins,
        Err(e) => {
            tracing::warn!(department, error = %e, "failed to load notification recipients");
            return 0;
        }
    };

    let mut sent = 0;
    for admin in admins
        .iter()
        .filter(|a| a.is_active && Some(a.id) != skip)
        .filter(|a| dept_equals(department, a.department.key()))
    {
        notify_admin(pool, events, admin.id, kind, title, message).await;
        sent += 1;
    }
    sent
}
