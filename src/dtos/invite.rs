//! Invite DTOs - Data Transfer Objects per gli inviti
//!
//! Nessun DTO espone token_hash, otp_hash o verification_token.

use crate::dtos::UserDTO;
use crate::entities::{Invite, InviteStatus, StaffRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body di POST /tenants/{tenant_id}/invites
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateInviteDTO {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub role: StaffRole,
}

impl CreateInviteDTO {
    /// Email in forma canonica (minuscola, senza spazi ai lati)
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            role: self.role,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Body di POST /invites/{token}/verify-code
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VerifyCodeDTO {
    #[serde(default)]
    pub code: String,
}

/// Body di POST /invites/{token}/accept
///
/// Any `role` or `email` field sent by the client is ignored: both always come from the invite.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AcceptInviteDTO {
    #[serde(default)]
    pub verification_token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

/// Risposta di creazione e reinvio
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatedInviteDTO {
    pub id: i32,
    pub email: String,
    pub role: StaffRole,
    pub expires_at: DateTime<Utc>,
    pub invite_link: String,
    pub email_delivered: bool,
}

/// Vista amministrativa di un invito (lista e dettaglio)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InviteSummaryDTO {
    pub id: i32,
    pub tenant_id: i32,
    pub email: String,
    pub role: StaffRole,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_expired: bool,
    pub is_locked: bool,
    pub otp_sent: bool,
    pub otp_send_count: i32,
    pub otp_attempts: i32,
    pub created_by: Option<UserDTO>,
}

impl InviteSummaryDTO {
    pub fn from_invite(invite: &Invite, created_by: Option<UserDTO>, now: DateTime<Utc>) -> Self {
        Self {
            id: invite.invite_id(),
            tenant_id: invite.tenant_id(),
            email: invite.email().to_string(),
            role: invite.role(),
            status: invite.status(),
            expires_at: invite.expires_at(),
            used_at: invite.used_at(),
            created_at: invite.created_at(),
            is_expired: invite.expires_at() <= now,
            is_locked: invite.locked_until().is_some_and(|until| until > now),
            otp_sent: invite.otp_sent(),
            otp_send_count: invite.otp_send_count(),
            otp_attempts: invite.otp_attempts(),
            created_by,
        }
    }
}

/// Risposta di POST /invites/{token}/send-code
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CodeSentDTO {
    pub message: String,
    pub expires_at: DateTime<Utc>,
    pub remaining_sends: i32,
}

/// Risposta di POST /invites/{token}/verify-code, il token serve per l'accettazione
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CodeVerifiedDTO {
    pub message: String,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Risposta di POST /invites/{token}/accept
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AcceptedInviteDTO {
    pub message: String,
    pub token: String,
    pub user: UserDTO,
    pub tenant_id: i32,
    pub garage_name: String,
    pub role: StaffRole,
}
