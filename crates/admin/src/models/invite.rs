//! Admin invite domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use activity_console_core::{
    AdminDepartment, AdminInviteId, AdminPermission, AdminRole, AdminUserId, Email, InviteStatus,
};

/// A tokenised offer of admin status to an email address.
///
/// The raw token is only ever held by the invitee; the row stores its hash.
#[derive(Debug, Clone, Serialize)]
pub struct AdminInvite {
    pub id: AdminInviteId,
    pub email: Email,
    pub role: AdminRole,
    pub department: AdminDepartment,
    pub permissions: Vec<AdminPermission>,
    /// Stored status; use [`AdminInvite::effective_status`] for display.
    pub status: InviteStatus,
    pub invited_by: Option<AdminUserId>,
    pub invited_by_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by: Option<AdminUserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl AdminInvite {
    /// Status with expiry applied: a pending invite past its expiry is `Expired`.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.status.is_pending() && now >= self.expires_at {
            InviteStatus::Expired
        } else {
            self.status
        }
    }

    /// Returns true if the token can still be redeemed.
    #[must_use]
    pub fn is_acceptable(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now).is_pending()
    }
}

/// Invite as returned by the list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InviteListItem {
    #[serde(flatten)]
    pub invite: AdminInvite,
    pub effective_status: InviteStatus,
}

impl InviteListItem {
    #[must_use]
    pub fn new(invite: AdminInvite, now: DateTime<Utc>) -> Self {
        let effective_status = invite.effective_status(now);
        Self {
            invite,
            effective_status,
        }
    }
}

/// A validated invite ready to be stored.
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub email: Email,
    pub role: AdminRole,
    pub department: AdminDepartment,
    pub permissions: Vec<AdminPermission>,
    pub token_hash: String,
    pub invited_by: Option<AdminUserId>,
    pub invited_by_email: Option<String>,
    pub expires_at: DateTime<Utc>,
}
