//! Status enums for console entities.

use serde::{Deserialize, Serialize};

/// Error returned when a stored status string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct StatusError {
    kind: &'static str,
    value: String,
}

/// Lifecycle of an admin invite.
///
/// `Pending` is the only state that can transition. `Expired` is never
/// written by a state change; it is derived at read time from the expiry
/// timestamp of a pending invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Cancelled,
    Expired,
}

impl InviteStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Returns true while the invite can still be accepted or cancelled.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InviteStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(StatusError {
                kind: "invite status",
                value: s.to_owned(),
            }),
        }
    }
}

/// Category of an in-console notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    InviteAccepted,
    AdminChanged,
    SettingsChanged,
    Attendance,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::InviteAccepted => "invite_accepted",
            Self::AdminChanged => "admin_changed",
            Self::SettingsChanged => "settings_changed",
            Self::Attendance => "attendance",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "invite_accepted" => Ok(Self::InviteAccepted),
            "admin_changed" => Ok(Self::AdminChanged),
            "settings_changed" => Ok(Self::SettingsChanged),
            "attendance" => Ok(Self::Attendance),
            _ => Err(StatusError {
                kind: "notification kind",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_status_parse() {
        for status in [
            InviteStatus::Pending,
            InviteStatus::Accepted,
            InviteStatus::Cancelled,
            InviteStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<InviteStatus>().unwrap(), status);
        }
        let err = "revoked".parse::<InviteStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid invite status: revoked");
    }

    #[test]
    fn test_only_pending_is_pending() {
        assert!(InviteStatus::Pending.is_pending());
        assert!(!InviteStatus::Expired.is_pending());
        assert!(!InviteStatus::Accepted.is_pending());
    }

    #[test]
    fn test_notification_kind_serde() {
        let json = serde_json::to_string(&NotificationKind::InviteAccepted).unwrap();
        assert_eq!(json, "\"invite_accepted\"");
        assert_eq!(
            "attendance".parse::<NotificationKind>().unwrap(),
            NotificationKind::Attendance
        );
    }
}
