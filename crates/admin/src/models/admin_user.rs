//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use activity_console_core::{
    AdminDepartment, AdminPermission, AdminRole, AdminUserId, Email, GuardSubject,
};

/// An admin profile (domain type).
///
/// `permissions` is always the effective list: either the explicit override
/// stored on the row or the role defaults when the row carries none.
#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: AdminUserId,
    pub email: Email,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    pub department: AdminDepartment,
    pub permissions: Vec<AdminPermission>,
    /// False when `permissions` came from role defaults.
    pub permissions_customized: bool,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub avatar_position: Option<AvatarPosition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<AdminUserId>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminProfile {
    /// Name shown in the console header and audit log.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            self.email.as_str()
        } else {
            &self.display_name
        }
    }
}

impl GuardSubject for AdminProfile {
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

/// Crop position for an avatar image, as percentages plus a zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarPosition {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for AvatarPosition {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 50.0,
            zoom: 1.0,
        }
    }
}

impl AvatarPosition {
    pub const MIN_ZOOM: f64 = 1.0;
    pub const MAX_ZOOM: f64 = 3.0;

    /// Check offsets are within 0..=100 and zoom within the supported range.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first out-of-range value.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.x) || !(0.0..=100.0).contains(&self.y) {
            return Err("avatar offsets must be between 0 and 100".to_string());
        }
        if !(Self::MIN_ZOOM..=Self::MAX_ZOOM).contains(&self.zoom) {
            return Err(format!(
                "avatar zoom must be between {} and {}",
                Self::MIN_ZOOM,
                Self::MAX_ZOOM
            ));
        }
        Ok(())
    }
}

/// Fields an admin may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Fields a higher-privilege admin may change on another admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminAccessUpdate {
    pub role: Option<AdminRole>,
    pub department: Option<String>,
    pub permissions: Option<Vec<AdminPermission>>,
    pub is_active: Option<bool>,
}

impl AdminAccessUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.department.is_none()
            && self.permissions.is_none()
            && self.is_active.is_none()
    }
}

/// Input for creating an admin row.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: Email,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    pub department: AdminDepartment,
    /// `None` stores no override so role defaults apply.
    pub permissions: Option<Vec<AdminPermission>>,
    pub created_by: Option<AdminUserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_position_bounds() {
        assert!(AvatarPosition::default().validate().is_ok());
        assert!(
            AvatarPosition {
                x: 101.0,
                y: 0.0,
                zoom: 1.0
            }
            .validate()
            .is_err()
        );
        assert!(
            AvatarPosition {
                x: 10.0,
                y: 10.0,
                zoom: 0.5
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_access_update_is_empty() {
        assert!(AdminAccessUpdate::default().is_empty());
        let update = AdminAccessUpdate {
            is_active: Some(false),
            ..AdminAccessUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
