//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};

use activity_console_core::{
    AdminDepartment, AdminPermission, AdminRole, AdminUserId, Email, GuardDenial,
    GuardRequirements, GuardSubject, authorize,
};

use super::admin_user::AdminProfile;

/// Session-stored admin identity.
///
/// Holds what the guard needs so most requests never touch the admin table.
/// `permissions` is decoded leniently: a missing, null or non-array value
/// becomes an empty list, which denies every permission-gated action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: AdminUserId,
    pub email: Email,
    pub display_name: String,
    pub role: AdminRole,
    pub department: AdminDepartment,
    #[serde(default, deserialize_with = "activity_console_core::types::permission::deserialize_lenient")]
    pub permissions: Vec<AdminPermission>,
}

impl CurrentAdmin {
    /// Run the guard against this admin.
    ///
    /// # Errors
    ///
    /// Returns the guard's denial.
    pub fn authorize(&self, requirements: &GuardRequirements) -> Result<(), GuardDenial> {
        authorize(Some(self), requirements)
    }

    /// Shorthand for a permission-only check.
    ///
    /// # Errors
    ///
    /// Returns [`GuardDenial::MissingPermission`] when the permission is not held.
    pub fn require(&self, permission: AdminPermission) -> Result<(), GuardDenial> {
        self.authorize(&GuardRequirements::permission(permission))
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }
}

impl GuardSubject for CurrentAdmin {
    fn role(&self) -> AdminRole {
        self.role
    }

    fn department(&self) -> AdminDepartment {
        self.department
    }

    fn permissions(&self) -> &[AdminPermission] {
        &self.permissions
    }
}

impl From<&AdminProfile> for CurrentAdmin {
    fn from(profile: &AdminProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            display_name: profile.label().to_owned(),
            role: profile.role,
            department: profile.department,
            permissions: profile.permissions.clone(),
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn session_value(permissions: serde_json::Value) -> serde_json::Value {
        json!({
            "id": 7,
            "email": "mod@uni.ac.th",
            "display_name": "Moderator",
            "role": "moderator",
            "department": "engineering",
            "permissions": permissions,
        })
    }

    #[test]
    fn test_missing_permissions_denies() {
        let mut value = session_value(json!([]));
        value.as_object_mut().unwrap().remove("permissions");
        let admin: CurrentAdmin = serde_json::from_value(value).unwrap();
        assert!(admin.require(AdminPermission::ViewReports).is_err());
    }

    #[test]
    fn test_non_array_permissions_denies() {
        let admin: CurrentAdmin =
            serde_json::from_value(session_value(json!("manage_admins"))).unwrap();
        assert!(admin.permissions.is_empty());
        assert!(admin.require(AdminPermission::ManageAdmins).is_err());
    }

    #[test]
    fn test_legacy_department_label_in_session() {
        let mut value = session_value(json!(["view_reports"]));
        value["department"] = json!("คณะวิศวกรรมศาสตร์");
        let admin: CurrentAdmin = serde_json::from_value(value).unwrap();
        assert_eq!(admin.department, AdminDepartment::Engineering);
        assert!(admin.require(AdminPermission::ViewReports).is_ok());
    }

    #[test]
    fn test_session_round_trip_keeps_permissions() {
        let admin: CurrentAdmin = serde_json::from_value(session_value(json!([
            "manage_activities",
            "view_reports",
            "moderate_content"
        ])))
        .unwrap();
        let back: CurrentAdmin =
            serde_json::from_value(serde_json::to_value(&admin).unwrap()).unwrap();
        assert_eq!(admin, back);
        assert_eq!(
            back.require(AdminPermission::ManageAdmins),
            Err(GuardDenial::MissingPermission(AdminPermission::ManageAdmins))
        );
    }
}
