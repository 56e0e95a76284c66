//! Live event fan-out for the console feed.
//!
//! Handlers publish into a broadcast channel; each SSE client holds its own
//! receiver wrapped in a stream that drops events outside the viewer's scope.
//! Dropping the stream drops the receiver, which unsubscribes.

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use activity_console_core::{AdminPermission, AdminUserId, GuardSubject, NotificationId};

use super::scope::DepartmentScope;
use crate::models::{ActivityRecord, CurrentAdmin};

/// Events buffered per subscriber before the slowest one starts lagging.
pub const EVENT_BUFFER: usize = 256;

/// Something that happened and may interest a signed-in admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    AttendanceRecorded {
        activity_code: String,
        activity_name: String,
        student_id: String,
        student_name: String,
        department: String,
        checked_in_at: DateTime<Utc>,
    },
    SettingsChanged {
        maintenance_enabled: bool,
    },
    NotificationCreated {
        recipient_id: AdminUserId,
        notification_id: NotificationId,
        title: String,
    },
}

impl LiveEvent {
    #[must_use]
    pub fn attendance(record: &ActivityRecord) -> Self {
        Self::AttendanceRecorded {
            activity_code: record.activity_code.clone(),
            activity_name: record.activity_name.clone(),
            student_id: record.student_id.clone(),
            student_name: record.student_name.clone(),
            department: record.department.clone(),
            checked_in_at: record.checked_in_at,
        }
    }

    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AttendanceRecorded { .. } => "attendance_recorded",
            Self::SettingsChanged { .. } => "settings_changed",
            Self::NotificationCreated { .. } => "notification_created",
        }
    }

    /// Whether `viewer` should receive this event.
    #[must_use]
    pub fn visible_to(&self, viewer: &CurrentAdmin) -> bool {
        match self {
            Self::AttendanceRecorded { department, .. } => {
                viewer.has_permission(AdminPermission::ViewReports)
                    && DepartmentScope::of(viewer).allows(department)
            }
            Self::SettingsChanged { .. } => true,
            Self::NotificationCreated { recipient_id, .. } => *recipient_id == viewer.id,
        }
    }
}

/// Shared publisher for live events.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<LiveEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(EVENT_BUFFER)
    }
}

impl EventHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers were listening.
    pub fn publish(&self, event: LiveEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of events visible to `viewer`.
    pub fn stream_for(&self, viewer: CurrentAdmin) -> impl Stream<Item = LiveEvent> + Send + 'static + use<> {
        let mut receiver = self.sender.subscribe();
        stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if event.visible_to(&viewer) {
                            yield event;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(admin_id = %viewer.id, skipped, "live feed subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;

    use activity_console_core::{AdminDepartment, AdminRole, Email};

    use super::*;

    fn viewer(id: i32, department: AdminDepartment) -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(id),
            email: Email::parse("viewer@uni.ac.th").unwrap(),
            display_name: "Viewer".to_string(),
            role: AdminRole::Viewer,
            department,
            permissions: vec![AdminPermission::ViewReports],
        }
    }

    fn attendance(department: &str) -> LiveEvent {
        LiveEvent::AttendanceRecorded {
            activity_code: "AB12CD".to_string(),
            activity_name: "Orientation".to_string(),
            student_id: "6400001".to_string(),
            student_name: "Somchai".to_string(),
            department: department.to_string(),
            checked_in_at: Utc::now(),
        }
    }

    #[test]
    fn test_visibility_rules() {
        let eng = viewer(1, AdminDepartment::Engineering);
        assert!(attendance("engineering").visible_to(&eng));
        assert!(attendance("คณะวิศวกรรมศาสตร์").visible_to(&eng));
        assert!(!attendance("science").visible_to(&eng));
        assert!(LiveEvent::SettingsChanged { maintenance_enabled: true }.visible_to(&eng));

        let note = LiveEvent::NotificationCreated {
            recipient_id: AdminUserId::new(2),
            notification_id: NotificationId::new(9),
            title: "hi".to_string(),
        };
        assert!(!note.visible_to(&eng));
        assert!(note.visible_to(&viewer(2, AdminDepartment::Science)));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = EventHub::default();
        assert_eq!(hub.publish(LiveEvent::SettingsChanged { maintenance_enabled: false }), 0);
    }

    #[tokio::test]
    async fn test_stream_filters_by_scope() {
        let hub = EventHub::new(8);
        let mut feed = Box::pin(hub.stream_for(viewer(1, AdminDepartment::Engineering)));
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(attendance("science"));
        hub.publish(attendance("engineering"));

        let event = feed.next().await.unwrap();
        assert!(matches!(
            event,
            LiveEvent::AttendanceRecorded { ref department, .. } if department == "engineering"
        ));

        drop(feed);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
