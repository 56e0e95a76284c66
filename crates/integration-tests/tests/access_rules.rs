//! Role, permission and department rules as they compose across modules.

use serde_json::json;

use activity_console_admin::models::CurrentAdmin;
use activity_console_admin::services::grants::{check_grant, validate_invite};
use activity_console_admin::services::{DepartmentScope, GrantError, GrantRequest, InviteError};
use activity_console_core::{
    AdminDepartment, AdminPermission, AdminRole, GuardDenial, GuardRequirements,
};
use activity_console_integration_tests::admin;

#[test]
fn test_session_with_malformed_permissions_fails_closed() {
    let stored = json!({
        "id": 7,
        "email": "staff@uni.ac.th",
        "display_name": "Staff",
        "role": "department_admin",
        "department": "คณะวิทยาศาสตร์",
        "permissions": "manage_admins",
    });
    let current: CurrentAdmin = serde_json::from_value(stored).unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(current.department, AdminDepartment::Science);
    assert!(current.permissions.is_empty());
    assert_eq!(
        current.require(AdminPermission::ViewReports),
        Err(GuardDenial::MissingPermission(AdminPermission::ViewReports))
    );
}

#[test]
fn test_department_requirement_respects_wildcard() {
    let requirements = GuardRequirements::permission(AdminPermission::ViewReports)
        .in_departments([AdminDepartment::Engineering]);

    let super_admin = admin(1, AdminRole::SuperAdmin, AdminDepartment::All);
    assert!(super_admin.authorize(&requirements).is_ok());

    let engineering = admin(2, AdminRole::Viewer, AdminDepartment::Engineering);
    assert!(engineering.authorize(&requirements).is_ok());

    let science = admin(3, AdminRole::Viewer, AdminDepartment::Science);
    assert_eq!(
        science.authorize(&requirements),
        Err(GuardDenial::DepartmentNotAllowed(AdminDepartment::Science))
    );
}

#[test]
fn test_scoped_admin_cannot_see_or_grant_outside_department() {
    let dean = admin(4, AdminRole::DepartmentAdmin, AdminDepartment::Science);
    let scope = DepartmentScope::of(&dean);

    assert!(scope.allows("science"));
    assert!(scope.allows("คณะวิทยาศาสตร์"));
    assert!(!scope.allows("engineering"));
    assert!(!scope.covers(AdminDepartment::All));

    let grant = check_grant(
        &dean,
        &GrantRequest {
            role: Some(AdminRole::Viewer),
            department: Some("engineering"),
            permissions: None,
        },
    );
    assert_eq!(
        grant,
        Err(GrantError::DepartmentOutOfScope(AdminDepartment::Engineering))
    );
}

#[test]
fn test_invite_from_department_admin_is_pinned_to_own_department() {
    let dean = admin(5, AdminRole::DepartmentAdmin, AdminDepartment::Nursing);
    let validated = validate_invite(
        &dean,
        "  New.Staff@Uni.ac.th ",
        &GrantRequest {
            role: Some(AdminRole::Moderator),
            department: None,
            permissions: None,
        },
    )
    .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(validated.email.as_str(), "new.staff@uni.ac.th");
    assert_eq!(validated.grant.department, AdminDepartment::Nursing);
    assert_eq!(validated.grant.permissions, None);
    assert_eq!(
        validated.grant.effective_permissions(),
        AdminRole::Moderator.default_permissions()
    );
}

#[test]
fn test_invite_cannot_hand_out_unheld_permission() {
    let dean = admin(6, AdminRole::DepartmentAdmin, AdminDepartment::Science);
    let result = validate_invite(
        &dean,
        "helper@uni.ac.th",
        &GrantRequest {
            role: Some(AdminRole::Viewer),
            department: Some("science"),
            permissions: Some(&[AdminPermission::ViewReports, AdminPermission::SystemSettings]),
        },
    );
    assert!(matches!(
        result,
        Err(InviteError::Grant(GrantError::PermissionNotHeld(
            AdminPermission::SystemSettings
        )))
    ));
}

#[test]
fn test_only_super_admin_grants_super_admin() {
    let dean = admin(7, AdminRole::DepartmentAdmin, AdminDepartment::Science);
    let request = GrantRequest {
        role: Some(AdminRole::SuperAdmin),
        department: None,
        permissions: None,
    };
    assert_eq!(check_grant(&dean, &request), Err(GrantError::SuperAdminOnly));

    let root = admin(8, AdminRole::SuperAdmin, AdminDepartment::All);
    let grant = check_grant(&root, &request).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(grant.department, AdminDepartment::All);
}

#[test]
fn test_viewer_cannot_invite_anyone() {
    let viewer = admin(9, AdminRole::Viewer, AdminDepartment::Science);
    let result = validate_invite(
        &viewer,
        "x@uni.ac.th",
        &GrantRequest {
            role: Some(AdminRole::Viewer),
            department: Some("science"),
            permissions: None,
        },
    );
    assert!(matches!(
        result,
        Err(InviteError::Grant(GrantError::Denied(GuardDenial::MissingPermission(
            AdminPermission::ManageAdmins
        ))))
    ));
}
