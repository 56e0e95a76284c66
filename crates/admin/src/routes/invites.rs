//! Admin invite handlers.
//!
//! These endpoints answer with the `{ ok, error?, items? }` envelope. Failures
//! already render as `{ ok: false, error }` through [`AppError`].

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use activity_console_core::{AdminInviteId, AdminPermission, AdminRole, NotificationKind};

use crate::db::admin_invites::InviteAcceptance;
use crate::db::{AdminInviteRepository, AdminUserRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{AdminInvite, InviteListItem, NewInvite, NewLogEntry, actions};
use crate::services::grants::validate_invite;
use crate::services::notify::notify_admin;
use crate::services::{DepartmentScope, GrantRequest, InviteEmail, audit, tokens};
use crate::state::AppState;

/// Build the invites router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invites/send", post(send))
        .route("/api/invites/cancel", post(cancel))
        .route("/api/invites/delete", post(delete))
        .route("/api/invites/list", get(list))
        .route("/api/invites/accept", post(accept))
}

/// Response envelope shared by the invite endpoints.
#[derive(Debug, Serialize)]
pub struct InviteEnvelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<T>>,
}

impl<T> InviteEnvelope<T> {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            ok: true,
            error: None,
            items: None,
        }
    }

    #[must_use]
    pub const fn with_items(items: Vec<T>) -> Self {
        Self {
            ok: true,
            error: None,
            items: Some(items),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendInviteRequest {
    pub email: String,
    pub role: Option<AdminRole>,
    pub department: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<AdminPermission>>,
}

#[derive(Debug, Deserialize)]
pub struct InviteIdRequest {
    pub id: AdminInviteId,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub display_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Load an invite the admin's scope covers.
async fn load_covered(
    state: &AppState,
    scope: &DepartmentScope,
    id: AdminInviteId,
) -> Result<AdminInvite> {
    let invite = AdminInviteRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("invite {id}")))?;
    if !scope.covers(invite.department) {
        return Err(AppError::NotFound(format!("invite {id}")));
    }
    Ok(invite)
}

/// Await `deliver`; if it fails, await `withdraw` so the unsent invite does
/// not block a retry, then return the delivery error.
async fn deliver_or_withdraw<E, W>(
    deliver: impl std::future::Future<Output = std::result::Result<(), E>>,
    withdraw: impl std::future::Future<Output = std::result::Result<bool, W>>,
) -> std::result::Result<(), E>
where
    E: std::fmt::Display,
    W: std::fmt::Display,
{
    let Err(e) = deliver.await else {
        return Ok(());
    };
    match withdraw.await {
        Ok(true) => tracing::warn!(error = %e, "invite email failed, invite withdrawn"),
        Ok(false) => tracing::warn!(error = %e, "invite email failed, invite already gone"),
        Err(undo) => {
            tracing::error!(error = %e, withdraw_error = %undo, "invite email failed and the invite could not be withdrawn");
        }
    }
    Err(e)
}

/// POST /api/invites/send
#[instrument(skip(admin, state, body))]
async fn send(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<SendInviteRequest>,
) -> Result<Json<InviteEnvelope<AdminInvite>>> {
    let validated = validate_invite(
        &admin,
        &body.email,
        &GrantRequest {
            role: body.role,
            department: body.department.as_deref(),
            permissions: body.permissions.as_deref(),
        },
    )?;

    if AdminUserRepository::new(state.pool())
        .email_exists(&validated.email)
        .await?
    {
        return Err(AppError::Conflict(
            "อีเมลนี้เป็นผู้ดูแลอยู่แล้ว (email is already an admin)".to_string(),
        ));
    }

    let repo = AdminInviteRepository::new(state.pool());
    let expired = repo.expire_stale(&validated.email).await?;
    if expired > 0 {
        tracing::debug!(email = %validated.email, expired, "expired stale invites");
    }
    if repo.has_open_invite(&validated.email).await? {
        return Err(AppError::Conflict(
            "มีคำเชิญที่รอการตอบรับอยู่แล้ว (a pending invite already exists)".to_string(),
        ));
    }

    let expiry_days = state.system_settings().await?.invite_expiry_days;
    let token = tokens::generate_invite_token();
    let token_hash = tokens::hash_secret(&state.config().session_secret, &token)?;
    let grant = validated.grant;

    let invite = repo
        .create(&NewInvite {
            email: validated.email,
            role: grant.role,
            department: grant.department,
            permissions: grant.permissions.unwrap_or_default(),
            token_hash,
            invited_by: Some(admin.id),
            invited_by_email: Some(admin.email.as_str().to_owned()),
            expires_at: Utc::now() + Duration::days(expiry_days),
        })
        .await?;

    let accept_url = state.config().invite_url(&token);
    match state.email() {
        Some(mailer) => {
            let expires_on = invite.expires_at.format("%Y-%m-%d").to_string();
            let email = InviteEmail {
                inviter: &admin.display_name,
                role_label: invite.role.label(),
                department_label: invite.department.legacy_label(),
                accept_url: &accept_url,
                expires_on: &expires_on,
            };
            deliver_or_withdraw(
                mailer.send_invite(invite.email.as_str(), &email),
                repo.withdraw_unsent(invite.id),
            )
            .await?;
        }
        None => {
            tracing::info!(email = %invite.email, url = %accept_url, "SMTP disabled, invite link not emailed");
        }
    }

    tracing::info!(invite_id = %invite.id, role = %invite.role, department = invite.department.key(), "invite sent");
    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::INVITE_SEND,
            "admin_invite",
            Some(invite.id.to_string()),
            invite.department.key(),
            json!({
                "email": invite.email,
                "role": invite.role,
                "permissions": invite.permissions,
                "expires_at": invite.expires_at,
            }),
        ),
    )
    .await;

    Ok(Json(InviteEnvelope::with_items(vec![invite])))
}

/// POST /api/invites/cancel
#[instrument(skip(admin, state))]
async fn cancel(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<InviteIdRequest>,
) -> Result<Json<InviteEnvelope<AdminInvite>>> {
    admin.require(AdminPermission::ManageAdmins)?;
    load_covered(&state, &DepartmentScope::of(&admin), body.id).await?;

    let invite = AdminInviteRepository::new(state.pool()).cancel(body.id).await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::INVITE_CANCEL,
            "admin_invite",
            Some(invite.id.to_string()),
            invite.department.key(),
            json!({ "email": invite.email }),
        ),
    )
    .await;

    Ok(Json(InviteEnvelope::with_items(vec![invite])))
}

/// POST /api/invites/delete
#[instrument(skip(admin, state))]
async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<InviteIdRequest>,
) -> Result<Json<InviteEnvelope<AdminInvite>>> {
    admin.require(AdminPermission::ManageAdmins)?;
    let invite = load_covered(&state, &DepartmentScope::of(&admin), body.id).await?;

    AdminInviteRepository::new(state.pool())
        .delete_non_pending(body.id)
        .await?;

    audit::record(
        state.pool(),
        audit::entry(
            &admin,
            actions::INVITE_DELETE,
            "admin_invite",
            Some(invite.id.to_string()),
            invite.department.key(),
            json!({ "email": invite.email, "status": invite.status }),
        ),
    )
    .await;

    Ok(Json(InviteEnvelope::ok()))
}

/// GET /api/invites/list
#[instrument(skip(admin, state))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<InviteEnvelope<InviteListItem>>> {
    admin.require(AdminPermission::ManageAdmins)?;
    let scope = DepartmentScope::of(&admin);
    let now = Utc::now();

    let items = AdminInviteRepository::new(state.pool())
        .list_all()
        .await?
        .into_iter()
        .filter(|invite| scope.covers(invite.department))
        .map(|invite| InviteListItem::new(invite, now))
        .collect();

    Ok(Json(InviteEnvelope::with_items(items)))
}

/// Redeem an invite token.
///
/// POST /api/invites/accept
#[instrument(skip(state, body))]
async fn accept(
    State(state): State<AppState>,
    Json(body): Json<AcceptInviteRequest>,
) -> Result<Json<InviteEnvelope<AdminInvite>>> {
    let display_name = body.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::BadRequest(
            "กรุณาระบุชื่อที่แสดง (display name is required)".to_string(),
        ));
    }

    let token_hash = tokens::hash_secret(&state.config().session_secret, body.token.trim())?;
    let repo = AdminInviteRepository::new(state.pool());
    let invalid = || {
        AppError::NotFound("คำเชิญไม่ถูกต้องหรือหมดอายุ (invite is invalid or expired)".to_string())
    };

    let invite = repo.get_by_token_hash(&token_hash).await?.ok_or_else(invalid)?;
    if !invite.is_acceptable(Utc::now()) {
        return Err(invalid());
    }

    let acceptance = InviteAcceptance {
        display_name: display_name.to_owned(),
        first_name: body.first_name,
        last_name: body.last_name,
    };
    let (invite, admin_id) = match repo.accept(&token_hash, &acceptance).await {
        Ok(accepted) => accepted,
        Err(RepositoryError::NotFound) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(invite_id = %invite.id, admin_id = %admin_id, "invite accepted");

    if let Some(inviter) = invite.invited_by {
        notify_admin(
            state.pool(),
            state.events(),
            inviter,
            NotificationKind::InviteAccepted,
            "คำเชิญได้รับการตอบรับ",
            &format!("{} accepted the invite as {}", invite.email, invite.role.label()),
        )
        .await;
    }

    audit::record(
        state.pool(),
        NewLogEntry {
            actor_id: Some(admin_id),
            actor_email: invite.email.as_str().to_owned(),
            action: actions::INVITE_ACCEPT,
            target_type: "admin_invite",
            target_id: Some(invite.id.to_string()),
            department: invite.department.key().to_owned(),
            details: json!({ "role": invite.role, "admin_id": admin_id }),
        },
    )
    .await;

    Ok(Json(InviteEnvelope::with_items(vec![invite])))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::future::ready;

    #[tokio::test]
    async fn test_failed_delivery_withdraws_invite() {
        let withdrawn = Cell::new(false);
        let result = deliver_or_withdraw(
            ready(Err::<(), _>("550 mailbox unavailable")),
            async {
                withdrawn.set(true);
                Ok::<_, String>(true)
            },
        )
        .await;

        assert_eq!(result, Err("550 mailbox unavailable"));
        assert!(withdrawn.get());
    }

    #[tokio::test]
    async fn test_delivered_invite_is_kept() {
        let withdrawn = Cell::new(false);
        let result = deliver_or_withdraw(ready(Ok::<(), String>(())), async {
            withdrawn.set(true);
            Ok::<_, String>(true)
        })
        .await;

        assert!(result.is_ok());
        assert!(!withdrawn.get());
    }

    #[tokio::test]
    async fn test_delivery_error_wins_over_withdraw_error() {
        let result = deliver_or_withdraw(
            ready(Err::<(), _>("smtp timeout")),
            ready(Err::<bool, _>("pool closed")),
        )
        .await;
        assert_eq!(result, Err("smtp timeout"));
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let body = serde_json::to_value(InviteEnvelope::<AdminInvite>::ok()).unwrap();
        assert_eq!(body, json!({ "ok": true }));
    }

    #[test]
    fn test_envelope_carries_items() {
        let body = serde_json::to_value(InviteEnvelope::with_items(vec![1, 2])).unwrap();
        assert_eq!(body, json!({ "ok": true, "items": [1, 2] }));
    }
}
