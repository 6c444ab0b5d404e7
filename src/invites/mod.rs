//! Invites module - Flusso di accettazione inviti con verifica email via OTP
//!
//! - `codec`: random secrets and their SHA-256 digests
//! - `policy`: lifetimes, send window, attempt counter and lockout
//! - `machine`: pure transitions on an `Invite`
//! - `service`: load / decide / save / notify on top of a `Store` and a `Notifier`
//! - `outcome`: typed results of every operation

pub mod codec;
pub mod machine;
pub mod outcome;
pub mod policy;
pub mod service;

pub use outcome::{
    AcceptOutcome, Acceptance, CreatePrecheck, InviteError, InvitePreview, IssuedInvite,
    LoadOutcome, ResendOutcome, SendOtpOutcome, ValidationFailure, VerifyOtpOutcome,
};
pub use policy::InvitePolicy;
pub use service::InviteService;

#[cfg(test)]
pub(crate) mod testing {
    use super::codec;
    use crate::entities::{Invite, InviteStatus, StaffRole};
    use chrono::{DateTime, TimeDelta, Utc};

    /// PENDING invite created at `now`, no code sent yet
    pub fn pending_invite(now: DateTime<Utc>) -> Invite {
        Invite {
            invite_id: 1,
            tenant_id: 1,
            email: "bob@example.com".to_string(),
            role: StaffRole::Mechanic,
            token_hash: codec::generate_secret().hash,
            status: InviteStatus::Pending,
            expires_at: now + TimeDelta::days(7),
            used_at: None,
            created_by_user_id: 1,
            otp_hash: None,
            otp_expires_at: None,
            otp_attempts: 0,
            otp_send_count: 0,
            otp_last_sent_at: None,
            locked_until: None,
            verification_token: None,
            verification_token_expires_at: None,
            version: 0,
            created_at: now,
        }
    }
}
