//! Admin bootstrap commands.
//!
//! # Usage
//!
//! ```bash
//! # Create the first super admin directly
//! console-cli admin create -e dean@uni.ac.th -n "Dean" -r super_admin
//!
//! # Invite a department admin; the accept link is printed to the log
//! console-cli admin invite -e staff@uni.ac.th -r department_admin -d science
//! ```
//!
//! # Environment Variables
//!
//! - `CONSOLE_DATABASE_URL` - `PostgreSQL` connection string
//! - `CONSOLE_SESSION_SECRET` - Key used to hash invite tokens (invite only)
//! - `CONSOLE_BASE_URL` - Base URL for the accept link (invite only)

use chrono::{Duration, Utc};
use secrecy::SecretString;
use thiserror::Error;

use activity_console_admin::db::{AdminInviteRepository, AdminUserRepository, RepositoryError};
use activity_console_admin::models::{NewAdmin, NewInvite, SystemSettings};
use activity_console_admin::services::tokens;
use activity_console_core::{AdminDepartment, AdminRole, Email};

use super::{ConnectError, connect, required_env};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("A department is required for role {0}")]
    MissingDepartment(AdminRole),

    #[error("Department 'all' is reserved for super admins")]
    WildcardReserved,

    #[error("Invite expiry must be between 1 and {max} days")]
    InvalidExpiry { max: i64 },

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error("Invite already pending for email: {0}")]
    InviteExists(String),

    #[error("Failed to hash invite token: {0}")]
    Token(#[from] tokens::TokenError),
}

/// Parsed and checked admin access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Access {
    role: AdminRole,
    department: AdminDepartment,
}

/// Super admins always get the wildcard; everyone else needs one real department.
fn resolve_access(
    role: AdminRole,
    department: Option<AdminDepartment>,
) -> Result<Access, AdminError> {
    if role == AdminRole::SuperAdmin {
        return Ok(Access {
            role,
            department: AdminDepartment::All,
        });
    }

    match department {
        None => Err(AdminError::MissingDepartment(role)),
        Some(department) if department.is_wildcard() => Err(AdminError::WildcardReserved),
        Some(department) => Ok(Access { role, department }),
    }
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse_normalized(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))
}

/// Create an admin user directly, with role default permissions.
///
/// Returns the id of the new admin.
pub async fn create_user(
    email: &str,
    name: &str,
    role: AdminRole,
    department: Option<AdminDepartment>,
) -> Result<i32, AdminError> {
    let email = parse_email(email)?;
    let access = resolve_access(role, department)?;

    let pool = connect().await?;
    let users = AdminUserRepository::new(&pool);

    if users.email_exists(&email).await? {
        return Err(AdminError::UserExists(email.into_inner()));
    }

    let created = users
        .create(&NewAdmin {
            email,
            display_name: name.trim().to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            role: access.role,
            department: access.department,
            permissions: None,
            created_by: None,
        })
        .await?;

    tracing::info!(
        admin_id = %created.id,
        email = %created.email,
        role = %created.role,
        department = created.department.key(),
        "Admin user created"
    );
    tracing::info!("They can sign in with an emailed one-time code.");

    Ok(created.id.as_i32())
}

/// Create an invite and log its accept link.
///
/// Returns the id of the new invite.
pub async fn create_invite(
    email: &str,
    role: AdminRole,
    department: Option<AdminDepartment>,
    expires_in_days: i64,
) -> Result<i32, AdminError> {
    let email = parse_email(email)?;
    let access = resolve_access(role, department)?;
    if !(1..=SystemSettings::MAX_INVITE_EXPIRY_DAYS).contains(&expires_in_days) {
        return Err(AdminError::InvalidExpiry {
            max: SystemSettings::MAX_INVITE_EXPIRY_DAYS,
        });
    }

    let secret = SecretString::from(required_env("CONSOLE_SESSION_SECRET")?);
    let base_url = required_env("CONSOLE_BASE_URL")?;

    let pool = connect().await?;
    if AdminUserRepository::new(&pool).email_exists(&email).await? {
        return Err(AdminError::UserExists(email.into_inner()));
    }

    let invites = AdminInviteRepository::new(&pool);
    invites.expire_stale(&email).await?;
    if invites.has_open_invite(&email).await? {
        return Err(AdminError::InviteExists(email.into_inner()));
    }

    let token = tokens::generate_invite_token();
    let invite = invites
        .create(&NewInvite {
            email,
            role: access.role,
            department: access.department,
            permissions: Vec::new(),
            token_hash: tokens::hash_secret(&secret, &token)?,
            invited_by: None,
            invited_by_email: None,
            expires_at: Utc::now() + Duration::days(expires_in_days),
        })
        .await?;

    let accept_url = format!(
        "{}/invite/accept?token={token}",
        base_url.trim_end_matches('/')
    );

    tracing::info!(
        invite_id = %invite.id,
        email = %invite.email,
        role = %invite.role,
        expires_at = %invite.expires_at,
        "Invite created"
    );
    tracing::info!("Share this link with the invitee: {accept_url}");

    Ok(invite.id.as_i32())
}
