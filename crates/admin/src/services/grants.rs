//! Rules for granting admin access.
//!
//! The same checks back invites, promotions and access edits, so an admin can
//! never hand out more than they hold: no higher role, no other department,
//! and no permission they lack themselves. Everything here is pure and runs
//! before any store or email call.

use activity_console_core::{
    AdminDepartment, AdminPermission, AdminRole, Email, EmailError, GuardDenial,
    GuardRequirements, GuardSubject, authorize,
};

use crate::models::{AdminAccessUpdate, AdminProfile, CurrentAdmin};

/// Requested access for a new or edited admin.
#[derive(Debug, Clone, Default)]
pub struct GrantRequest<'a> {
    pub role: Option<AdminRole>,
    /// Raw department as sent by the client (key or label).
    pub department: Option<&'a str>,
    /// Explicit permission override. `None` or empty means role defaults.
    pub permissions: Option<&'a [AdminPermission]>,
}

/// Access that passed every grant rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub role: AdminRole,
    pub department: AdminDepartment,
    /// `None` means the role defaults apply.
    pub permissions: Option<Vec<AdminPermission>>,
}

impl Grant {
    /// Permissions the grantee will actually hold.
    #[must_use]
    pub fn effective_permissions(&self) -> Vec<AdminPermission> {
        self.permissions
            .clone()
            .unwrap_or_else(|| self.role.default_permissions().to_vec())
    }
}

/// Why a grant was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantError {
    #[error(transparent)]
    Denied(#[from] GuardDenial),

    #[error("กรุณาระบุบทบาท (role is required)")]
    MissingRole,

    #[error("ไม่สามารถมอบบทบาทที่สูงกว่าของตนเองได้ (cannot grant {requested} as {actor})")]
    RoleTooHigh {
        requested: AdminRole,
        actor: AdminRole,
    },

    #[error("เฉพาะผู้ดูแลระบบสูงสุดเท่านั้นที่มอบสิทธิ์นี้ได้ (only a super admin can grant super_admin)")]
    SuperAdminOnly,

    #[error("หน่วยงาน 'ทั้งหมด' สงวนไว้สำหรับผู้ดูแลระบบสูงสุด (department 'all' is reserved for super admins)")]
    WildcardReserved,

    #[error("ไม่สามารถมอบสิทธิ์ในหน่วยงานอื่นได้ (department {0} is outside your scope)")]
    DepartmentOutOfScope(AdminDepartment),

    #[error("กรุณาระบุหน่วยงาน (department is required)")]
    MissingDepartment,

    #[error("ไม่รู้จักหน่วยงาน (unknown department: {0})")]
    UnknownDepartment(String),

    #[error("ไม่สามารถมอบสิทธิ์ที่ตนเองไม่มีได้ (you do not hold {0})")]
    PermissionNotHeld(AdminPermission),

    #[error("ไม่สามารถแก้ไขสิทธิ์ของตนเองได้ (cannot change your own access)")]
    SelfEdit,

    #[error("ไม่สามารถแก้ไขผู้ดูแลที่มีบทบาทเท่ากันหรือสูงกว่าได้ (target role {0} is not below yours)")]
    TargetNotOutranked(AdminRole),
}

/// Check that `actor` may grant `request`, and resolve the resulting access.
///
/// # Errors
///
/// Returns the first rule that fails.
pub fn check_grant<S>(actor: &S, request: &GrantRequest<'_>) -> Result<Grant, GrantError>
where
    S: GuardSubject + ?Sized,
{
    authorize(
        Some(actor),
        &GuardRequirements::permission(AdminPermission::ManageAdmins),
    )?;

    let actor_role = actor.role();
    let actor_is_super = actor_role == AdminRole::SuperAdmin;
    let role = request.role.ok_or(GrantError::MissingRole)?;

    if role == AdminRole::SuperAdmin && !actor_is_super {
        return Err(GrantError::SuperAdminOnly);
    }
    if !actor_role.at_least(role) {
        return Err(GrantError::RoleTooHigh {
            requested: role,
            actor: actor_role,
        });
    }

    let department = resolve_department(actor, role, request.department)?;

    let permissions = match request.permissions {
        Some(list) if !list.is_empty() => {
            let mut unique = Vec::with_capacity(list.len());
            for p in list {
                if !unique.contains(p) {
                    unique.push(*p);
                }
            }
            Some(unique)
        }
        _ => None,
    };

    let grant = Grant {
        role,
        department,
        permissions,
    };

    if !actor_is_super {
        if let Some(missing) = grant
            .effective_permissions()
            .into_iter()
            .find(|p| !actor.has_permission(*p))
        {
            return Err(GrantError::PermissionNotHeld(missing));
        }
    }

    Ok(grant)
}

fn resolve_department<S>(
    actor: &S,
    role: AdminRole,
    requested: Option<&str>,
) -> Result<AdminDepartment, GrantError>
where
    S: GuardSubject + ?Sized,
{
    if role == AdminRole::SuperAdmin {
        return Ok(AdminDepartment::All);
    }

    let requested = match requested.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => Some(
            AdminDepartment::parse_lenient(raw)
                .ok_or_else(|| GrantError::UnknownDepartment(raw.to_owned()))?,
        ),
        None => None,
    };

    if requested == Some(AdminDepartment::All) {
        return Err(GrantError::WildcardReserved);
    }

    let own = actor.department();
    if own.is_wildcard() {
        return requested.ok_or(GrantError::MissingDepartment);
    }

    match requested {
        None => Ok(own),
        Some(dept) if dept == own => Ok(dept),
        Some(dept) => Err(GrantError::DepartmentOutOfScope(dept)),
    }
}

/// An invite that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedInvite {
    pub email: Email,
    pub grant: Grant,
}

/// Why an invite was refused before anything was stored or sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InviteError {
    #[error("อีเมลไม่ถูกต้อง (invalid email: {0})")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Grant(#[from] GrantError),
}

impl From<GuardDenial> for InviteError {
    fn from(denial: GuardDenial) -> Self {
        Self::Grant(GrantError::Denied(denial))
    }
}

/// Validate an invite request.
///
/// # Errors
///
/// Returns `InviteError` for a bad email or any failed grant rule.
pub fn validate_invite<S>(
    actor: &S,
    raw_email: &str,
    request: &GrantRequest<'_>,
) -> Result<ValidatedInvite, InviteError>
where
    S: GuardSubject + ?Sized,
{
    authorize(
        Some(actor),
        &GuardRequirements::permission(AdminPermission::ManageAdmins),
    )?;
    let email = Email::parse_normalized(raw_email)?;
    let grant = check_grant(actor, request)?;
    Ok(ValidatedInvite { email, grant })
}

/// Check that `actor` may change `target`'s access at all.
///
/// # Errors
///
/// Returns `GrantError` when the actor lacks `manage_admins`, targets
/// themselves, does not outrank the target, or the target is out of scope.
pub fn check_edit_target(actor: &CurrentAdmin, target: &AdminProfile) -> Result<(), GrantError> {
    actor.require(AdminPermission::ManageAdmins)?;

    if actor.id == target.id {
        return Err(GrantError::SelfEdit);
    }
    if actor.is_super_admin() {
        return Ok(());
    }
    if actor.role <= target.role {
        return Err(GrantError::TargetNotOutranked(target.role));
    }
    if !actor.department.is_wildcard() && target.department != actor.department {
        return Err(GrantError::DepartmentOutOfScope(target.department));
    }
    Ok(())
}

/// The full access row to write after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPlan {
    pub role: AdminRole,
    pub department: AdminDepartment,
    pub permissions: Option<Vec<AdminPermission>>,
    pub is_active: bool,
}

/// Merge a partial access update into `target` and check it.
///
/// Only the fields present in `update` are changed. When nothing but
/// `is_active` changes, the grant rules are not re-run against the
/// target's existing access.
///
/// # Errors
///
/// Returns `GrantError` if the edit is not allowed.
pub fn plan_access_update(
    actor: &CurrentAdmin,
    target: &AdminProfile,
    update: &AdminAccessUpdate,
) -> Result<AccessPlan, GrantError> {
    check_edit_target(actor, target)?;

    let is_active = update.is_active.unwrap_or(target.is_active);
    let current_override = target
        .permissions_customized
        .then(|| target.permissions.clone());

    if update.role.is_none() && update.department.is_none() && update.permissions.is_none() {
        return Ok(AccessPlan {
            role: target.role,
            department: target.department,
            permissions: current_override,
            is_active,
        });
    }

    let role = update.role.unwrap_or(target.role);
    let department = update
        .department
        .as_deref()
        .or_else(|| (!target.department.is_wildcard()).then(|| target.department.key()));
    let permissions: Option<&[AdminPermission]> = match &update.permissions {
        Some(list) => Some(list.as_slice()),
        None => current_override.as_deref(),
    };

    let grant = check_grant(
        actor,
        &GrantRequest {
            role: Some(role),
            department,
            permissions,
        },
    )?;

    Ok(AccessPlan {
        role: grant.role,
        department: grant.department,
        permissions: grant.permissions,
        is_active,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use activity_console_core::AdminUserId;

    use super::*;

    fn current(id: i32, role: AdminRole, department: AdminDepartment) -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(id),
            email: Email::parse(&format!("admin{id}@uni.ac.th")).unwrap(),
            display_name: format!("Admin {id}"),
            role,
            department,
            permissions: role.default_permissions().to_vec(),
        }
    }

    fn profile(id: i32, role: AdminRole, department: AdminDepartment) -> AdminProfile {
        let now = Utc::now();
        AdminProfile {
            id: AdminUserId::new(id),
            email: Email::parse(&format!("target{id}@uni.ac.th")).unwrap(),
            display_name: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            department,
            permissions: role.default_permissions().to_vec(),
            permissions_customized: false,
            is_active: true,
            avatar_url: None,
            avatar_position: None,
            created_at: now,
            updated_at: now,
            created_by: None,
            last_login_at: None,
        }
    }

    fn request(role: AdminRole, department: Option<&str>) -> GrantRequest<'_> {
        GrantRequest {
            role: Some(role),
            department,
            permissions: None,
        }
    }

    #[test]
    fn test_department_admin_cannot_grant_super_admin() {
        let actor = current(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);
        assert_eq!(
            check_grant(&actor, &request(AdminRole::SuperAdmin, None)),
            Err(GrantError::SuperAdminOnly)
        );
    }

    #[test]
    fn test_moderator_lacks_manage_admins() {
        let actor = current(1, AdminRole::Moderator, AdminDepartment::Science);
        assert_eq!(
            check_grant(&actor, &request(AdminRole::Viewer, None)),
            Err(GrantError::Denied(GuardDenial::MissingPermission(
                AdminPermission::ManageAdmins
            )))
        );
    }

    #[test]
    fn test_department_admin_pinned_to_own_department() {
        let actor = current(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);
        let grant = check_grant(&actor, &request(AdminRole::Viewer, None)).unwrap();
        assert_eq!(grant.department, AdminDepartment::Science);
        assert_eq!(grant.permissions, None);

        let legacy = check_grant(&actor, &request(AdminRole::Viewer, Some("คณะวิทยาศาสตร์")));
        assert_eq!(legacy.unwrap().department, AdminDepartment::Science);

        assert_eq!(
            check_grant(&actor, &request(AdminRole::Viewer, Some("nursing"))),
            Err(GrantError::DepartmentOutOfScope(AdminDepartment::Nursing))
        );
        assert_eq!(
            check_grant(&actor, &request(AdminRole::Viewer, Some("all"))),
            Err(GrantError::WildcardReserved)
        );
    }

    #[test]
    fn test_super_admin_must_name_department_for_scoped_roles() {
        let actor = current(1, AdminRole::SuperAdmin, AdminDepartment::All);
        assert_eq!(
            check_grant(&actor, &request(AdminRole::Moderator, None)),
            Err(GrantError::MissingDepartment)
        );
        assert_eq!(
            check_grant(&actor, &request(AdminRole::Moderator, Some("all"))),
            Err(GrantError::WildcardReserved)
        );
        let grant = check_grant(&actor, &request(AdminRole::SuperAdmin, Some("science"))).unwrap();
        assert_eq!(grant.department, AdminDepartment::All);
    }

    #[test]
    fn test_cannot_grant_unheld_permission() {
        let actor = current(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);
        let perms = [AdminPermission::ViewReports, AdminPermission::SystemSettings];
        let req = GrantRequest {
            role: Some(AdminRole::Moderator),
            department: None,
            permissions: Some(&perms),
        };
        assert_eq!(
            check_grant(&actor, &req),
            Err(GrantError::PermissionNotHeld(AdminPermission::SystemSettings))
        );
    }

    #[test]
    fn test_explicit_permissions_deduplicated() {
        let actor = current(1, AdminRole::SuperAdmin, AdminDepartment::All);
        let perms = [AdminPermission::ViewReports, AdminPermission::ViewReports];
        let req = GrantRequest {
            role: Some(AdminRole::Viewer),
            department: Some("science"),
            permissions: Some(&perms),
        };
        assert_eq!(
            check_grant(&actor, &req).unwrap().permissions,
            Some(vec![AdminPermission::ViewReports])
        );
    }

    #[test]
    fn test_invite_validation_rejects_bad_email_first() {
        let actor = current(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);
        assert!(matches!(
            validate_invite(&actor, "not-an-email", &request(AdminRole::Viewer, None)),
            Err(InviteError::InvalidEmail(_))
        ));
        let ok = validate_invite(&actor, "  New.Admin@Uni.ac.th ", &request(AdminRole::Viewer, None))
            .unwrap();
        assert_eq!(ok.email.as_str(), "new.admin@uni.ac.th");
    }

    #[test]
    fn test_edit_requires_outranking_target() {
        let actor = current(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);
        let peer = profile(2, AdminRole::DepartmentAdmin, AdminDepartment::Science);
        assert_eq!(
            check_edit_target(&actor, &peer),
            Err(GrantError::TargetNotOutranked(AdminRole::DepartmentAdmin))
        );
        let outsider = profile(3, AdminRole::Viewer, AdminDepartment::Nursing);
        assert_eq!(
            check_edit_target(&actor, &outsider),
            Err(GrantError::DepartmentOutOfScope(AdminDepartment::Nursing))
        );
    }

    #[test]
    fn test_super_admin_cannot_edit_self() {
        let actor = current(1, AdminRole::SuperAdmin, AdminDepartment::All);
        let me = profile(1, AdminRole::SuperAdmin, AdminDepartment::All);
        assert_eq!(check_edit_target(&actor, &me), Err(GrantError::SelfEdit));
        let other = profile(2, AdminRole::SuperAdmin, AdminDepartment::All);
        assert!(check_edit_target(&actor, &other).is_ok());
    }

    #[test]
    fn test_plan_keeps_unchanged_fields() {
        let actor = current(1, AdminRole::SuperAdmin, AdminDepartment::All);
        let target = profile(2, AdminRole::Viewer, AdminDepartment::Nursing);

        let deactivate = AdminAccessUpdate {
            is_active: Some(false),
            ..AdminAccessUpdate::default()
        };
        let plan = plan_access_update(&actor, &target, &deactivate).unwrap();
        assert_eq!(plan.role, AdminRole::Viewer);
        assert_eq!(plan.department, AdminDepartment::Nursing);
        assert!(!plan.is_active);

        let promote = AdminAccessUpdate {
            role: Some(AdminRole::Moderator),
            ..AdminAccessUpdate::default()
        };
        let plan = plan_access_update(&actor, &target, &promote).unwrap();
        assert_eq!(plan.role, AdminRole::Moderator);
        assert_eq!(plan.department, AdminDepartment::Nursing);
        assert_eq!(plan.permissions, None);
    }

    #[test]
    fn test_demoting_super_admin_needs_department() {
        let actor = current(1, AdminRole::SuperAdmin, AdminDepartment::All);
        let target = profile(2, AdminRole::SuperAdmin, AdminDepartment::All);
        let demote = AdminAccessUpdate {
            role: Some(AdminRole::DepartmentAdmin),
            ..AdminAccessUpdate::default()
        };
        assert_eq!(
            plan_access_update(&actor, &target, &demote),
            Err(GrantError::MissingDepartment)
        );
    }
}
