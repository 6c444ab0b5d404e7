//! Esiti delle operazioni sugli inviti ed errori infrastrutturali
//!
//! Business outcomes are plain enum variants returned in `Ok(..)`. Only
//! infrastructure failures travel as `InviteError`.

use crate::entities::{Invite, InviteStatus, StaffRole, Tenant, User};
use crate::notifications::NotifyError;
use crate::repositories::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InviteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("email delivery failed: {0}")]
    Delivery(#[from] NotifyError),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// Too many concurrent writers on the same invite
    #[error("invite {0} is under concurrent modification")]
    Contention(i32),

    /// The invite changed state (accepted, expired, deleted) while being updated
    #[error("invite {0} is no longer pending")]
    Superseded(i32),

    #[error("tenant {0} not found")]
    MissingTenant(i32),
}

/// Result of resolving a raw invite token
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Found(Invite),
    /// Too short to be a token, no lookup performed
    Malformed,
    NotFound,
    Expired,
    AlreadyUsed,
}

/// Public, masked projection of an invite
#[derive(Debug, Clone, Serialize)]
pub struct InvitePreview {
    pub garage_name: String,
    pub role: StaffRole,
    pub email: String,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub otp_sent: bool,
    pub is_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOtpOutcome {
    Sent {
        expires_at: DateTime<Utc>,
        remaining_sends: i32,
    },
    Locked {
        retry_after_seconds: i64,
    },
    RateLimited {
        retry_after_seconds: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOtpOutcome {
    /// `verification_token` is raw and cannot be recovered later
    Verified {
        verification_token: String,
        expires_at: DateTime<Utc>,
    },
    MalformedCode,
    NoCodeSent,
    CodeExpired,
    Locked {
        retry_after_seconds: i64,
    },
    Invalid {
        remaining_attempts: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingName,
    MissingPassword,
    PasswordTooShort { min: usize },
}

impl ValidationFailure {
    pub fn message(&self) -> String {
        match self {
            ValidationFailure::MissingName => "Name is required".to_string(),
            ValidationFailure::MissingPassword => "Password is required".to_string(),
            ValidationFailure::PasswordTooShort { min } => {
                format!("Password must be at least {} characters", min)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Acceptance {
    pub user: User,
    pub tenant: Tenant,
    /// Role actually held in the tenant (the pre-existing one for members)
    pub role: StaffRole,
    pub is_new_user: bool,
    pub already_member: bool,
}

#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Accepted(Acceptance),
    VerificationRequired,
    InvalidVerification,
    VerificationExpired,
    ValidationError(ValidationFailure),
    DuplicateMembership,
}

/// Output of create and resend
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub invite: Invite,
    pub raw_token: String,
    pub invite_link: String,
    pub email_delivered: bool,
}

#[derive(Debug, Clone)]
pub enum ResendOutcome {
    Resent(IssuedInvite),
    NotFound,
}

/// Caller-side preconditions of invite creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePrecheck {
    Allowed,
    PendingInviteExists,
    AlreadyMember,
}
