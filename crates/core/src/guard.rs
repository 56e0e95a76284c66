//! The authorization predicate.
//!
//! Every privileged console action is gated by [`authorize`]. The check is a
//! pure function of the signed-in admin and the action's requirements, so the
//! same rules apply to HTTP handlers, background services and the CLI.
//!
//! Checks run in a fixed order: authentication, permission, role rank,
//! department. The first failing check determines the denial.

use crate::types::{AdminDepartment, AdminPermission, AdminRole, dept_equals};

/// Anything that can be authorized: the session admin, a loaded profile.
pub trait GuardSubject {
    /// The admin's role.
    fn role(&self) -> AdminRole;

    /// The admin's effective department.
    fn department(&self) -> AdminDepartment;

    /// Permissions explicitly held. Role defaults are not consulted here.
    fn permissions(&self) -> &[AdminPermission];

    /// Exact membership test against [`GuardSubject::permissions`].
    fn has_permission(&self, permission: AdminPermission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// What an action demands of the caller. Empty requirements only demand a
/// signed-in admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardRequirements {
    pub permission: Option<AdminPermission>,
    pub role: Option<AdminRole>,
    pub departments: Option<Vec<AdminDepartment>>,
}

impl GuardRequirements {
    /// Require only a signed-in admin.
    #[must_use]
    pub fn signed_in() -> Self {
        Self::default()
    }

    /// Require a permission.
    #[must_use]
    pub fn permission(permission: AdminPermission) -> Self {
        Self {
            permission: Some(permission),
            ..Self::default()
        }
    }

    /// Require a minimum role.
    #[must_use]
    pub fn role(role: AdminRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: AdminPermission) -> Self {
        self.permission = Some(permission);
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: AdminRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Restrict to admins of the given departments. Wildcard admins always pass.
    #[must_use]
    pub fn in_departments(mut self, departments: impl IntoIterator<Item = AdminDepartment>) -> Self {
        self.departments = Some(departments.into_iter().collect());
        self
    }
}

/// Why an action was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardDenial {
    #[error("ไม่ได้เข้าสู่ระบบ (not authenticated)")]
    NotAuthenticated,

    #[error("คุณไม่มีสิทธิ์เข้าถึงส่วนนี้ (missing permission: {0})")]
    MissingPermission(AdminPermission),

    #[error("คุณไม่มีสิทธิ์เข้าถึงส่วนนี้ (requires role {required}, has {actual})")]
    InsufficientRole {
        required: AdminRole,
        actual: AdminRole,
    },

    #[error("คุณไม่มีสิทธิ์เข้าถึงข้อมูลของหน่วยงานนี้ (department {0} not allowed)")]
    DepartmentNotAllowed(AdminDepartment),
}

impl GuardDenial {
    /// Returns true when the caller should sign in rather than be told no.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

/// Decide whether `subject` may perform an action with `requirements`.
///
/// # Errors
///
/// Returns the first [`GuardDenial`] encountered.
pub fn authorize<S>(subject: Option<&S>, requirements: &GuardRequirements) -> Result<(), GuardDenial>
where
    S: GuardSubject + ?Sized,
{
    let subject = subject.ok_or(GuardDenial::NotAuthenticated)?;

    if let Some(permission) = requirements.permission {
        if !subject.has_permission(permission) {
            return Err(GuardDenial::MissingPermission(permission));
        }
    }

    if let Some(required) = requirements.role {
        let actual = subject.role();
        if !actual.at_least(required) {
            return Err(GuardDenial::InsufficientRole { required, actual });
        }
    }

    if let Some(allowed) = &requirements.departments {
        let own = subject.department();
        let permitted = own.is_wildcard()
            || allowed
                .iter()
                .any(|dept| dept_equals(own.key(), dept.key()));
        if !permitted {
            return Err(GuardDenial::DepartmentNotAllowed(own));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Admin {
        role: AdminRole,
        department: AdminDepartment,
        permissions: Vec<AdminPermission>,
    }

    impl GuardSubject for Admin {
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

    fn admin(role: AdminRole, department: AdminDepartment) -> Admin {
        Admin {
            role,
            department,
            permissions: role.default_permissions().to_vec(),
        }
    }

    #[test]
    fn test_absent_subject_is_unauthenticated() {
        let denial = authorize::<Admin>(None, &GuardRequirements::signed_in()).unwrap_err();
        assert!(denial.is_unauthenticated());
    }

    #[test]
    fn test_signed_in_passes_empty_requirements() {
        let viewer = admin(AdminRole::Viewer, AdminDepartment::Science);
        assert!(authorize(Some(&viewer), &GuardRequirements::signed_in()).is_ok());
    }

    #[test]
    fn test_moderator_cannot_manage_admins() {
        let moderator = admin(AdminRole::Moderator, AdminDepartment::Engineering);
        let result = authorize(
            Some(&moderator),
            &GuardRequirements::permission(AdminPermission::ManageAdmins),
        );
        assert_eq!(
            result,
            Err(GuardDenial::MissingPermission(AdminPermission::ManageAdmins))
        );
    }

    #[test]
    fn test_empty_permissions_deny() {
        let stripped = Admin {
            role: AdminRole::SuperAdmin,
            department: AdminDepartment::All,
            permissions: Vec::new(),
        };
        for permission in AdminPermission::ALL {
            assert!(
                authorize(Some(&stripped), &GuardRequirements::permission(permission)).is_err()
            );
        }
    }

    #[test]
    fn test_higher_roles_pass_lower_requirements() {
        for actual in AdminRole::ALL {
            for required in AdminRole::ALL {
                let subject = admin(actual, AdminDepartment::Nursing);
                let result = authorize(Some(&subject), &GuardRequirements::role(required));
                assert_eq!(result.is_ok(), actual >= required, "{actual} vs {required}");
            }
        }
    }

    #[test]
    fn test_department_membership() {
        let reqs = GuardRequirements::signed_in()
            .in_departments([AdminDepartment::Science, AdminDepartment::Education]);

        let science = admin(AdminRole::DepartmentAdmin, AdminDepartment::Science);
        assert!(authorize(Some(&science), &reqs).is_ok());

        let nursing = admin(AdminRole::DepartmentAdmin, AdminDepartment::Nursing);
        assert_eq!(
            authorize(Some(&nursing), &reqs),
            Err(GuardDenial::DepartmentNotAllowed(AdminDepartment::Nursing))
        );

        let everywhere = admin(AdminRole::SuperAdmin, AdminDepartment::All);
        assert!(authorize(Some(&everywhere), &reqs).is_ok());
    }

    #[test]
    fn test_permission_checked_before_role() {
        let viewer = admin(AdminRole::Viewer, AdminDepartment::Science);
        let reqs = GuardRequirements::permission(AdminPermission::ExportData)
            .with_role(AdminRole::SuperAdmin);
        assert!(matches!(
            authorize(Some(&viewer), &reqs),
            Err(GuardDenial::MissingPermission(_))
        ));
    }

    #[test]
    fn test_role_then_permission_builder() {
        let moderator = admin(AdminRole::Moderator, AdminDepartment::Science);
        let reqs = GuardRequirements::role(AdminRole::Moderator)
            .with_permission(AdminPermission::ManageAdmins);
        assert_eq!(
            authorize(Some(&moderator), &reqs),
            Err(GuardDenial::MissingPermission(AdminPermission::ManageAdmins))
        );
        let reqs = GuardRequirements::role(AdminRole::Moderator)
            .with_permission(AdminPermission::ModerateContent);
        assert!(authorize(Some(&moderator), &reqs).is_ok());
    }

    #[test]
    fn test_denial_messages_are_displayable() {
        let msg = GuardDenial::MissingPermission(AdminPermission::ManageAdmins).to_string();
        assert!(msg.contains("manage_admins"));
    }
}
