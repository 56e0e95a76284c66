//! Admin user repository for database operations.
//!
//! Rows written before schema version 1 may carry a Thai department label
//! instead of a key, and a loosely typed permissions value. Every read goes
//! through [`adapt_stored_access`], which decodes those fields, fails closed
//! on anything it cannot interpret, and reports whether the row should be
//! rewritten in the current shape.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use activity_console_core::{
    AdminDepartment, AdminPermission, AdminRole, AdminUserId, Email, RawPermissions,
};

use super::RepositoryError;
use crate::models::{AdminProfile, AvatarPosition, NewAdmin, ProfileUpdate};

/// Shape version written by this build.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

const ADMIN_COLUMNS: &str = "id, email, display_name, first_name, last_name, role, department, \
     permissions, is_active, schema_version, avatar_url, avatar_position, \
     created_at, updated_at, created_by, last_login_at";

// =============================================================================
// Read-time adapter
// =============================================================================

/// What to do with the stored permissions value when rewriting a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRewrite {
    /// Leave the stored value untouched.
    Keep,
    /// Replace it with this cleaned list.
    Set(Vec<AdminPermission>),
}

/// Fields to persist when upgrading a legacy row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRewrite {
    pub department: AdminDepartment,
    pub permissions: PermissionRewrite,
}

/// Decoded access fields of an admin row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptedAccess {
    pub department: AdminDepartment,
    pub permissions: Vec<AdminPermission>,
    /// False when `permissions` are the role defaults.
    pub customized: bool,
    /// Set when the stored row is not in the current shape.
    pub rewrite: Option<LegacyRewrite>,
}

/// Decode the department and permissions of a stored admin row.
///
/// - department: key or legacy label; anything else is data corruption
/// - permissions absent, null or `[]`: role defaults
/// - permissions array: its recognised entries (unknown entries dropped)
/// - permissions of any other shape: no permissions at all
///
/// A malformed or fully unrecognised permissions value is never rewritten,
/// since storing `[]` would silently grant the role defaults.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` for an unrecognised department.
pub fn adapt_stored_access(
    schema_version: i32,
    role: AdminRole,
    department: &str,
    permissions: Option<&Value>,
) -> Result<AdaptedAccess, RepositoryError> {
    let dept = AdminDepartment::parse_lenient(department).ok_or_else(|| {
        RepositoryError::DataCorruption(format!("unrecognized admin department: {department:?}"))
    })?;

    let mut dirty = schema_version < CURRENT_SCHEMA_VERSION || dept.key() != department;
    let mut permission_rewrite = PermissionRewrite::Keep;

    let (granted, customized) = match RawPermissions::from_value(permissions) {
        RawPermissions::Missing => (role.default_permissions().to_vec(), false),
        RawPermissions::List {
            permissions,
            rejected: 0,
        } if permissions.is_empty() => (role.default_permissions().to_vec(), false),
        RawPermissions::List {
            permissions,
            rejected,
        } if permissions.is_empty() => {
            tracing::warn!(rejected, "admin permissions contain no recognised entries");
            (Vec::new(), true)
        }
        RawPermissions::List {
            permissions,
            rejected,
        } => {
            if rejected > 0 {
                tracing::warn!(rejected, "dropping unrecognised admin permissions");
                permission_rewrite = PermissionRewrite::Set(permissions.clone());
                dirty = true;
            }
            (permissions, true)
        }
        RawPermissions::Malformed => {
            tracing::warn!("admin permissions value is not an array; treating as empty");
            (Vec::new(), true)
        }
    };

    Ok(AdaptedAccess {
        department: dept,
        permissions: granted,
        customized,
        rewrite: dirty.then_some(LegacyRewrite {
            department: dept,
            permissions: permission_rewrite,
        }),
    })
}

/// Encode a permission list the way it is stored.
#[must_use]
pub fn permissions_json(permissions: &[AdminPermission]) -> Value {
    Value::Array(
        permissions
            .iter()
            .map(|p| Value::String(p.as_str().to_owned()))
            .collect(),
    )
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: i32,
    email: String,
    display_name: String,
    first_name: String,
    last_name: String,
    role: String,
    department: String,
    permissions: Option<Value>,
    is_active: bool,
    schema_version: i32,
    avatar_url: Option<String>,
    avatar_position: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<i32>,
    last_login_at: Option<DateTime<Utc>>,
}

impl AdminUserRow {
    fn into_profile(self) -> Result<(AdminProfile, Option<LegacyRewrite>), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role: AdminRole = self.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;
        let access = adapt_stored_access(
            self.schema_version,
            role,
            &self.department,
            self.permissions.as_ref(),
        )?;
        let avatar_position = match self.avatar_position {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value::<AvatarPosition>(value) {
                Ok(position) => Some(position),
                Err(e) => {
                    tracing::warn!(admin_id = self.id, error = %e, "ignoring malformed avatar position");
                    None
                }
            },
        };

        let profile = AdminProfile {
            id: AdminUserId::new(self.id),
            email,
            display_name: self.display_name,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            department: access.department,
            permissions: access.permissions,
            permissions_customized: access.customized,
            is_active: self.is_active,
            avatar_url: self.avatar_url,
            avatar_position,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by.map(AdminUserId::new),
            last_login_at: self.last_login_at,
        };
        Ok((profile, access.rewrite))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Decode a row, upgrading it in place when it is in a legacy shape.
    async fn hydrate(&self, row: AdminUserRow) -> Result<AdminProfile, RepositoryError> {
        let (profile, rewrite) = row.into_profile()?;
        if let Some(rewrite) = rewrite {
            if let Err(e) = self.rewrite_legacy(profile.id, &rewrite).await {
                tracing::warn!(admin_id = %profile.id, error = %e, "failed to upgrade legacy admin row");
            }
        }
        Ok(profile)
    }

    /// Decode a list of rows, skipping (and reporting) rows that fail closed.
    async fn hydrate_all(&self, rows: Vec<AdminUserRow>) -> Vec<AdminProfile> {
        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match self.hydrate(row).await {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::error!(admin_id = id, error = %e, "skipping unreadable admin row"),
            }
        }
        profiles
    }

    /// List all admin users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<AdminProfile>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM console.admin_user ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(self.hydrate_all(rows).await)
    }

    /// Get an admin user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row cannot be decoded.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM console.admin_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Get an admin user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row cannot be decoded.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<AdminProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM console.admin_user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Returns true if any admin row (active or not) uses this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM console.admin_user WHERE email = $1)",
        )
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, admin: &NewAdmin) -> Result<AdminProfile, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            INSERT INTO console.admin_user
                (email, display_name, first_name, last_name, role, department,
                 permissions, created_by, schema_version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(admin.email.as_str())
        .bind(&admin.display_name)
        .bind(&admin.first_name)
        .bind(&admin.last_name)
        .bind(admin.role.as_str())
        .bind(admin.department.key())
        .bind(admin.permissions.as_deref().map(permissions_json))
        .bind(admin.created_by)
        .bind(CURRENT_SCHEMA_VERSION)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_as_conflict(e, "email already exists"))?;

        self.hydrate(row).await
    }

    /// Update the self-editable profile fields. `None` keeps the current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: AdminUserId,
        update: &ProfileUpdate,
    ) -> Result<AdminProfile, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            UPDATE console.admin_user
            SET display_name = COALESCE($2, display_name),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.display_name.as_deref().map(str::trim))
        .bind(update.first_name.as_deref().map(str::trim))
        .bind(update.last_name.as_deref().map(str::trim))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.hydrate(row).await
    }

    /// Replace the access fields of an admin.
    ///
    /// `permissions = None` clears the override so role defaults apply.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_access(
        &self,
        id: AdminUserId,
        role: AdminRole,
        department: AdminDepartment,
        permissions: Option<&[AdminPermission]>,
        is_active: bool,
    ) -> Result<AdminProfile, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            UPDATE console.admin_user
            SET role = $2, department = $3, permissions = $4, is_active = $5,
                schema_version = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(department.key())
        .bind(permissions.map(permissions_json))
        .bind(is_active)
        .bind(CURRENT_SCHEMA_VERSION)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.hydrate(row).await
    }

    /// Drop the permission override so the role defaults apply.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn reset_permissions(&self, id: AdminUserId) -> Result<AdminProfile, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            UPDATE console.admin_user
            SET permissions = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.hydrate(row).await
    }

    /// Revoke admin status. The row is kept for the audit trail.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn revoke(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE console.admin_user
            SET is_active = FALSE, revoked_at = NOW(), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Store a new avatar URL and reset the crop position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_avatar(
        &self,
        id: AdminUserId,
        avatar_url: &str,
    ) -> Result<AdminProfile, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            UPDATE console.admin_user
            SET avatar_url = $2, avatar_position = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.hydrate(row).await
    }

    /// Persist the avatar crop position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_avatar_position(
        &self,
        id: AdminUserId,
        position: AvatarPosition,
    ) -> Result<AdminProfile, RepositoryError> {
        let value = serde_json::json!({
            "x": position.x,
            "y": position.y,
            "zoom": position.zoom,
        });
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            r"
            UPDATE console.admin_user
            SET avatar_position = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(value)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.hydrate(row).await
    }

    /// Record a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE console.admin_user SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn rewrite_legacy(
        &self,
        id: AdminUserId,
        rewrite: &LegacyRewrite,
    ) -> Result<(), RepositoryError> {
        let permissions = match &rewrite.permissions {
            PermissionRewrite::Keep => None,
            PermissionRewrite::Set(list) => Some(permissions_json(list)),
        };
        sqlx::query(
            r"
            UPDATE console.admin_user
            SET department = $2,
                permissions = COALESCE($3, permissions),
                schema_version = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(rewrite.department.key())
        .bind(permissions)
        .bind(CURRENT_SCHEMA_VERSION)
        .execute(self.pool)
        .await?;

        tracing::info!(admin_id = %id, "upgraded legacy admin row");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_current_row_needs_no_rewrite() {
        let access = adapt_stored_access(
            CURRENT_SCHEMA_VERSION,
            AdminRole::Moderator,
            "engineering",
            Some(&json!(["view_reports"])),
        )
        .unwrap();
        assert_eq!(access.department, AdminDepartment::Engineering);
        assert_eq!(access.permissions, vec![AdminPermission::ViewReports]);
        assert!(access.customized);
        assert_eq!(access.rewrite, None);
    }

    #[test]
    fn test_absent_or_empty_permissions_use_role_defaults() {
        for stored in [None, Some(json!(null)), Some(json!([]))] {
            let access = adapt_stored_access(
                CURRENT_SCHEMA_VERSION,
                AdminRole::Moderator,
                "science",
                stored.as_ref(),
            )
            .unwrap();
            assert_eq!(
                access.permissions,
                AdminRole::Moderator.default_permissions().to_vec()
            );
            assert!(!access.customized);
        }
    }

    #[test]
    fn test_malformed_permissions_fail_closed() {
        let access = adapt_stored_access(
            CURRENT_SCHEMA_VERSION,
            AdminRole::SuperAdmin,
            "all",
            Some(&json!("manage_admins,system_settings")),
        )
        .unwrap();
        assert!(access.permissions.is_empty());
        assert_eq!(access.rewrite, None);
    }

    #[test]
    fn test_unrecognised_only_permissions_fail_closed() {
        let access = adapt_stored_access(
            CURRENT_SCHEMA_VERSION,
            AdminRole::DepartmentAdmin,
            "nursing",
            Some(&json!(["everything"])),
        )
        .unwrap();
        assert!(access.permissions.is_empty());
        assert!(access.customized);
    }

    #[test]
    fn test_legacy_row_is_upgraded() {
        let access = adapt_stored_access(
            0,
            AdminRole::Viewer,
            "คณะพยาบาลศาสตร์",
            Some(&json!(["view_reports", "legacy_flag"])),
        )
        .unwrap();
        assert_eq!(access.department, AdminDepartment::Nursing);
        assert_eq!(
            access.rewrite,
            Some(LegacyRewrite {
                department: AdminDepartment::Nursing,
                permissions: PermissionRewrite::Set(vec![AdminPermission::ViewReports]),
            })
        );
    }

    #[test]
    fn test_unknown_department_is_corruption() {
        let err = adapt_stored_access(1, AdminRole::Viewer, "Moon Campus", None).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_permissions_json_shape() {
        assert_eq!(
            permissions_json(&[AdminPermission::ExportData, AdminPermission::ViewReports]),
            json!(["export_data", "view_reports"])
        );
    }
}
