//! Admin permissions.
//!
//! A permission is a named capability, independent of role rank. Membership
//! is exact: `manage_admins` never matches `manage_admin` or a prefix.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Errors that can occur when parsing an [`AdminPermission`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The input is not one of the seven permission keys.
    #[error("invalid admin permission: {0}")]
    Unknown(String),
}

/// A capability that gates a specific console action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    /// Create and edit student/user records.
    ManageUsers,
    /// Create, edit and QR-code activities.
    ManageActivities,
    /// View attendance records and audit logs.
    ViewReports,
    /// Download CSV exports.
    ExportData,
    /// Invite, promote and revoke admins.
    ManageAdmins,
    /// Change global system settings.
    SystemSettings,
    /// Moderate user-submitted content.
    ModerateContent,
}

impl AdminPermission {
    /// Every permission, in display order.
    pub const ALL: [Self; 7] = [
        Self::ManageUsers,
        Self::ManageActivities,
        Self::ViewReports,
        Self::ExportData,
        Self::ManageAdmins,
        Self::SystemSettings,
        Self::ModerateContent,
    ];

    /// The storage/wire key for this permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageActivities => "manage_activities",
            Self::ViewReports => "view_reports",
            Self::ExportData => "export_data",
            Self::ManageAdmins => "manage_admins",
            Self::SystemSettings => "system_settings",
            Self::ModerateContent => "moderate_content",
        }
    }
}

impl std::fmt::Display for AdminPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminPermission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PermissionError::Unknown(s.to_owned()))
    }
}

/// Result of reading a loosely-typed permissions value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPermissions {
    /// The field was absent or `null`.
    Missing,
    /// The field was an array; unknown entries have been dropped.
    List {
        /// Recognised permissions, deduplicated, in first-seen order.
        permissions: Vec<AdminPermission>,
        /// Entries that were not recognised permission keys.
        rejected: usize,
    },
    /// The field was present but not an array.
    Malformed,
}

impl RawPermissions {
    /// Classify a JSON value that is supposed to hold a permission array.
    #[must_use]
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(items)) => {
                let mut permissions = Vec::with_capacity(items.len());
                let mut rejected = 0;
                for item in items {
                    match item.as_str().map(str::parse::<AdminPermission>) {
                        Some(Ok(p)) => {
                            if !permissions.contains(&p) {
                                permissions.push(p);
                            }
                        }
                        _ => rejected += 1,
                    }
                }
                Self::List {
                    permissions,
                    rejected,
                }
            }
            Some(_) => Self::Malformed,
        }
    }

    /// The permissions this value grants on its own, with no role fallback.
    ///
    /// Missing and malformed values grant nothing.
    #[must_use]
    pub fn into_granted(self) -> Vec<AdminPermission> {
        match self {
            Self::List { permissions, .. } => permissions,
            Self::Missing | Self::Malformed => Vec::new(),
        }
    }
}

/// Deserialize a permission list without ever failing.
///
/// Missing, `null` and non-array values become an empty list; unknown keys
/// are dropped. Use with `#[serde(default, deserialize_with = "...")]` on
/// fields that come from sessions or legacy documents.
///
/// # Errors
///
/// Only propagates errors from the underlying deserializer itself (e.g.
/// truncated input), never from the shape of the value.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<AdminPermission>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(RawPermissions::from_value(value.as_ref()).into_granted())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_lenient")]
        permissions: Vec<AdminPermission>,
    }

    #[test]
    fn test_parse_all_keys() {
        for p in AdminPermission::ALL {
            assert_eq!(p.as_str().parse::<AdminPermission>().unwrap(), p);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        assert!("manage_admin".parse::<AdminPermission>().is_err());
        assert!("MANAGE_ADMINS".parse::<AdminPermission>().is_err());
        assert!("manage".parse::<AdminPermission>().is_err());
    }

    #[test]
    fn test_raw_permissions_classification() {
        assert_eq!(RawPermissions::from_value(None), RawPermissions::Missing);
        assert_eq!(
            RawPermissions::from_value(Some(&Value::Null)),
            RawPermissions::Missing
        );
        assert_eq!(
            RawPermissions::from_value(Some(&json!("manage_admins"))),
            RawPermissions::Malformed
        );
        assert_eq!(
            RawPermissions::from_value(Some(&json!({"0": "manage_admins"}))),
            RawPermissions::Malformed
        );
        assert_eq!(
            RawPermissions::from_value(Some(&json!(["view_reports", "bogus", 3, "view_reports"]))),
            RawPermissions::List {
                permissions: vec![AdminPermission::ViewReports],
                rejected: 2,
            }
        );
    }

    #[test]
    fn test_lenient_missing_field() {
        let holder: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(holder.permissions.is_empty());
    }

    #[test]
    fn test_lenient_null_field() {
        let holder: Holder = serde_json::from_value(json!({"permissions": null})).unwrap();
        assert!(holder.permissions.is_empty());
    }

    #[test]
    fn test_lenient_non_array_field() {
        let holder: Holder =
            serde_json::from_value(json!({"permissions": "manage_admins"})).unwrap();
        assert!(holder.permissions.is_empty());

        let holder: Holder = serde_json::from_value(json!({"permissions": 42})).unwrap();
        assert!(holder.permissions.is_empty());
    }

    #[test]
    fn test_lenient_array_field() {
        let holder: Holder =
            serde_json::from_value(json!({"permissions": ["export_data", "nope"]})).unwrap();
        assert_eq!(holder.permissions, vec![AdminPermission::ExportData]);
    }
}
