//! Invite entity - Entità invito con sotto-stato OTP, lockout e verifica
//!
//! The persisted shape is flat (one row / one document per invite). Fields are
//! crate-private: every mutation goes through the state machine in
//! `crate::invites`, which keeps the counters and the lock consistent.

use super::enums::{InviteStatus, StaffRole};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Invite {
    pub(crate) invite_id: i32,
    pub(crate) tenant_id: i32,
    pub(crate) email: String,
    pub(crate) role: StaffRole,
    pub(crate) token_hash: String,
    pub(crate) status: InviteStatus,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) used_at: Option<DateTime<Utc>>,
    pub(crate) created_by_user_id: i32,

    pub(crate) otp_hash: Option<String>,
    pub(crate) otp_expires_at: Option<DateTime<Utc>>,
    pub(crate) otp_attempts: i32,
    pub(crate) otp_send_count: i32,
    pub(crate) otp_last_sent_at: Option<DateTime<Utc>>,
    pub(crate) locked_until: Option<DateTime<Utc>>,

    pub(crate) verification_token: Option<String>,
    pub(crate) verification_token_expires_at: Option<DateTime<Utc>>,

    pub(crate) version: i32,
    pub(crate) created_at: DateTime<Utc>,
}

/// Data needed to insert a fresh invite (id, version and created_at come from the store).
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub(crate) tenant_id: i32,
    pub(crate) email: String,
    pub(crate) role: StaffRole,
    pub(crate) token_hash: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) created_by_user_id: i32,
}

/// Where an invite stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// PENDING, not expired, never used
    Active,
    Accepted,
    Expired,
}

/// Read-side view of the OTP columns as a single tagged union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpState<'a> {
    NoCodeIssued,
    CodeIssued {
        hash: &'a str,
        expires_at: DateTime<Utc>,
        attempts: i32,
    },
    Locked {
        until: DateTime<Utc>,
    },
}

impl Invite {
    pub fn invite_id(&self) -> i32 {
        self.invite_id
    }

    pub fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> StaffRole {
        self.role
    }

    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }

    pub fn status(&self) -> InviteStatus {
        self.status
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn used_at(&self) -> Option<DateTime<Utc>> {
        self.used_at
    }

    pub fn created_by_user_id(&self) -> i32 {
        self.created_by_user_id
    }

    pub fn otp_expires_at(&self) -> Option<DateTime<Utc>> {
        self.otp_expires_at
    }

    pub fn otp_attempts(&self) -> i32 {
        self.otp_attempts
    }

    pub fn otp_send_count(&self) -> i32 {
        self.otp_send_count
    }

    pub fn otp_last_sent_at(&self) -> Option<DateTime<Utc>> {
        self.otp_last_sent_at
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }

    pub fn verification_expires_at(&self) -> Option<DateTime<Utc>> {
        self.verification_token_expires_at
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when a code has been issued and not yet consumed.
    pub fn otp_sent(&self) -> bool {
        self.otp_hash.is_some()
    }

    /// True when a verification token is waiting to be consumed by acceptance.
    pub fn is_verified(&self) -> bool {
        self.verification_token.is_some()
    }

    /// Expiry is checked before usage, a used invite past its deadline reads as expired.
    pub fn lifecycle(&self, now: DateTime<Utc>) -> Lifecycle {
        if self.expires_at <= now || self.status == InviteStatus::Expired {
            Lifecycle::Expired
        } else if self.used_at.is_some() || self.status == InviteStatus::Accepted {
            Lifecycle::Accepted
        } else {
            Lifecycle::Active
        }
    }

    pub fn otp_state(&self, now: DateTime<Utc>) -> OtpState<'_> {
        if let Some(until) = self.locked_until.filter(|until| *until > now) {
            return OtpState::Locked { until };
        }
        match (self.otp_hash.as_deref(), self.otp_expires_at) {
            (Some(hash), Some(expires_at)) => OtpState::CodeIssued {
                hash,
                expires_at,
                attempts: self.otp_attempts,
            },
            _ => OtpState::NoCodeIssued,
        }
    }
}
