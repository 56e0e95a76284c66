//! Admin roles.
//!
//! Roles are totally ordered by rank. Anything that asks "is this admin at
//! least a moderator?" compares with `>=`, which relies on the declaration
//! order below.

use serde::{Deserialize, Serialize};

use super::permission::AdminPermission;

/// Errors that can occur when parsing an [`AdminRole`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    /// The input is not one of the four role keys.
    #[error("invalid admin role: {0}")]
    Unknown(String),
}

/// Admin role, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Read-only access to reports within one department.
    Viewer,
    /// Manages activities and moderates content.
    Moderator,
    /// Manages users, activities and admins within one department.
    DepartmentAdmin,
    /// Unrestricted access, including system settings.
    SuperAdmin,
}

impl AdminRole {
    /// Every role in rank order.
    pub const ALL: [Self; 4] = [
        Self::Viewer,
        Self::Moderator,
        Self::DepartmentAdmin,
        Self::SuperAdmin,
    ];

    /// Position of this role in the rank order (0 = lowest).
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// The storage/wire key for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Moderator => "moderator",
            Self::DepartmentAdmin => "department_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Thai label shown in the console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Viewer => "ผู้ดูข้อมูล",
            Self::Moderator => "ผู้ดูแลเนื้อหา",
            Self::DepartmentAdmin => "ผู้ดูแลระดับคณะ",
            Self::SuperAdmin => "ผู้ดูแลระบบสูงสุด",
        }
    }

    /// Default permission set granted to this role.
    ///
    /// Used whenever an admin record carries no explicit permission list, and
    /// when an operator resets an admin to role defaults.
    #[must_use]
    pub fn default_permissions(self) -> &'static [AdminPermission] {
        use AdminPermission::{
            ExportData, ManageActivities, ManageAdmins, ManageUsers, ModerateContent,
            SystemSettings, ViewReports,
        };

        match self {
            Self::Viewer => &[ViewReports],
            Self::Moderator => &[ManageActivities, ViewReports, ModerateContent],
            Self::DepartmentAdmin => &[
                ManageUsers,
                ManageActivities,
                ViewReports,
                ExportData,
                ManageAdmins,
                ModerateContent,
            ],
            Self::SuperAdmin => &[
                ManageUsers,
                ManageActivities,
                ViewReports,
                ExportData,
                ManageAdmins,
                SystemSettings,
                ModerateContent,
            ],
        }
    }

    /// Returns true if the role's default set contains `permission`.
    #[must_use]
    pub fn grants(self, permission: AdminPermission) -> bool {
        self.default_permissions().contains(&permission)
    }

    /// Returns true if this role ranks at or above `required`.
    #[must_use]
    pub fn at_least(self, required: Self) -> bool {
        self >= required
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "viewer" => Ok(Self::Viewer),
            "moderator" => Ok(Self::Moderator),
            "department_admin" => Ok(Self::DepartmentAdmin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(RoleError::Unknown(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order() {
        assert!(AdminRole::Viewer < AdminRole::Moderator);
        assert!(AdminRole::Moderator < AdminRole::DepartmentAdmin);
        assert!(AdminRole::DepartmentAdmin < AdminRole::SuperAdmin);
        assert_eq!(AdminRole::Viewer.rank(), 0);
        assert_eq!(AdminRole::SuperAdmin.rank(), 3);
    }

    #[test]
    fn test_grants_matches_default_table() {
        for role in AdminRole::ALL {
            for permission in AdminPermission::ALL {
                assert_eq!(
                    role.grants(permission),
                    role.default_permissions().contains(&permission),
                    "{role} / {permission}"
                );
            }
        }
    }

    #[test]
    fn test_only_super_admin_gets_system_settings() {
        for role in AdminRole::ALL {
            assert_eq!(
                role.grants(AdminPermission::SystemSettings),
                role == AdminRole::SuperAdmin
            );
        }
    }

    #[test]
    fn test_default_sets_are_nested_by_rank() {
        for pair in AdminRole::ALL.windows(2) {
            let [lower, higher] = pair else { continue };
            for permission in lower.default_permissions() {
                assert!(higher.grants(*permission), "{higher} lacks {permission}");
            }
        }
    }

    #[test]
    fn test_moderator_defaults() {
        assert_eq!(
            AdminRole::Moderator.default_permissions(),
            &[
                AdminPermission::ManageActivities,
                AdminPermission::ViewReports,
                AdminPermission::ModerateContent
            ]
        );
    }

    #[test]
    fn test_parse_roundtrip_keys() {
        for role in AdminRole::ALL {
            assert_eq!(role.as_str().parse::<AdminRole>().unwrap(), role);
        }
        assert!("admin".parse::<AdminRole>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&AdminRole::DepartmentAdmin).unwrap();
        assert_eq!(json, "\"department_admin\"");
    }
}
