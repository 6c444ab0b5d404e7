//! Invite state machine - transizioni pure sull'invito
//!
//! Every function here decides and mutates an in-memory `Invite`; none of them
//! touches storage or sends email. The returned `Decision` says whether the
//! record must be saved and which emails to send once it is.

use super::codec::{self, Secret};
use super::outcome::{
    AcceptOutcome, InviteError, InvitePreview, SendOtpOutcome, ValidationFailure,
    VerifyOtpOutcome,
};
use super::policy::{AttemptOutcome, InvitePolicy, SendDecision, seconds_until};
use crate::dtos::AcceptInviteDTO;
use crate::entities::{Invite, InviteStatus, Lifecycle, NewInvite, OtpState, StaffRole};
use crate::notifications::{InviteEmail, Notification, OtpEmail};
use chrono::{DateTime, Utc};

/// Result of a transition
#[derive(Debug)]
pub struct Decision<T> {
    pub outcome: T,
    /// the invite was mutated and has to be saved
    pub dirty: bool,
    pub notifications: Vec<Notification>,
}

impl<T> Decision<T> {
    fn new(outcome: T, dirty: bool) -> Self {
        Self {
            outcome,
            dirty,
            notifications: Vec::new(),
        }
    }

    fn notify(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }
}

/// What invite emails need besides the invite itself
#[derive(Debug, Clone)]
pub struct MailContext {
    pub garage_name: String,
    pub inviter_name: Option<String>,
    pub public_url: String,
}

// ************************* MUTAZIONI DELL'INVITO ************************* //

impl Invite {
    /// Clears a lock whose deadline has passed, together with the failed attempts
    fn lift_elapsed_lock(&mut self, policy: &InvitePolicy, now: DateTime<Utc>) -> bool {
        if policy.lock_elapsed(self, now) {
            self.locked_until = None;
            self.otp_attempts = 0;
            true
        } else {
            false
        }
    }

    fn issue_code(&mut self, hash: String, expires_at: DateTime<Utc>, send_count: i32, now: DateTime<Utc>) {
        self.otp_hash = Some(hash);
        self.otp_expires_at = Some(expires_at);
        self.otp_send_count = send_count;
        self.otp_last_sent_at = Some(now);
        self.otp_attempts = 0;
    }

    fn record_failed_attempt(&mut self, attempts: i32) {
        self.otp_attempts = attempts;
    }

    /// Counter and lock always land in the same save
    fn lock(&mut self, attempts: i32, until: DateTime<Utc>) {
        self.otp_attempts = attempts;
        self.locked_until = Some(until);
    }

    fn mark_verified(&mut self, verification_hash: String, expires_at: DateTime<Utc>) {
        self.verification_token = Some(verification_hash);
        self.verification_token_expires_at = Some(expires_at);
        self.otp_hash = None;
        self.otp_expires_at = None;
        self.otp_attempts = 0;
    }

    fn mark_accepted(&mut self, now: DateTime<Utc>) {
        self.used_at = Some(now);
        self.status = InviteStatus::Accepted;
        self.verification_token = None;
        self.verification_token_expires_at = None;
        self.otp_hash = None;
        self.otp_expires_at = None;
        self.otp_attempts = 0;
    }

    /// New bearer token and deadline, every OTP/lockout/verification field back to its initial value
    fn rotate(&mut self, token_hash: String, expires_at: DateTime<Utc>) {
        self.token_hash = token_hash;
        self.expires_at = expires_at;
        self.status = InviteStatus::Pending;
        self.otp_hash = None;
        self.otp_expires_at = None;
        self.otp_attempts = 0;
        self.otp_send_count = 0;
        self.otp_last_sent_at = None;
        self.locked_until = None;
        self.verification_token = None;
        self.verification_token_expires_at = None;
    }
}

// ************************* TRANSIZIONI ************************* //

pub fn invite_link(public_url: &str, raw_token: &str) -> String {
    format!("{}/invite/{}", public_url.trim_end_matches('/'), raw_token)
}

pub fn invite_notification(invite: &Invite, raw_token: &str, ctx: &MailContext) -> Notification {
    Notification::Invite(InviteEmail {
        to: invite.email.clone(),
        garage_name: ctx.garage_name.clone(),
        role: invite.role,
        invite_link: invite_link(&ctx.public_url, raw_token),
        inviter_name: ctx.inviter_name.clone(),
    })
}

/// Fresh PENDING invite; the raw token is returned and never stored
pub fn new_invite(
    tenant_id: i32,
    inviter_id: i32,
    email: &str,
    role: StaffRole,
    policy: &InvitePolicy,
    now: DateTime<Utc>,
) -> (NewInvite, Secret) {
    let secret = codec::generate_secret();
    let data = NewInvite {
        tenant_id,
        email: email.to_string(),
        role,
        token_hash: secret.hash.clone(),
        expires_at: now + policy.invite_ttl,
        created_by_user_id: inviter_id,
    };
    (data, secret)
}

/// Fails when a reloaded invite is no longer PENDING-active
pub fn ensure_active(invite: &Invite, now: DateTime<Utc>) -> Result<(), InviteError> {
    match invite.lifecycle(now) {
        Lifecycle::Active => Ok(()),
        Lifecycle::Accepted | Lifecycle::Expired => Err(InviteError::Superseded(invite.invite_id)),
    }
}

/// `ab***@domain` (or `a***@domain` when the local part is 1-2 characters long)
pub fn mask_email(email: &str) -> String {
    let (local, domain) = email.split_once('@').unwrap_or((email, ""));
    let keep = if local.chars().count() <= 2 { 1 } else { 2 };
    let visible: String = local.chars().take(keep).collect();
    format!("{}***@{}", visible, domain)
}

pub fn preview(invite: &Invite, garage_name: &str, policy: &InvitePolicy, now: DateTime<Utc>) -> InvitePreview {
    InvitePreview {
        garage_name: garage_name.to_string(),
        role: invite.role,
        email: mask_email(&invite.email),
        status: invite.status,
        expires_at: invite.expires_at,
        otp_sent: invite.otp_sent(),
        is_locked: policy.is_locked(invite, now),
    }
}

pub fn send_otp(
    invite: &mut Invite,
    policy: &InvitePolicy,
    garage_name: &str,
    now: DateTime<Utc>,
) -> Decision<SendOtpOutcome> {
    let dirty = invite.lift_elapsed_lock(policy, now);

    if policy.is_locked(invite, now) {
        let retry_after_seconds = policy.lock_retry_after(invite, now);
        return Decision::new(SendOtpOutcome::Locked { retry_after_seconds }, dirty);
    }

    if let SendDecision::Blocked { retry_after_seconds } = policy.can_send_otp(invite, now) {
        return Decision::new(SendOtpOutcome::RateLimited { retry_after_seconds }, dirty);
    }

    let send_count = policy.roll_send_window(invite, now) + 1;
    let otp = codec::generate_otp();
    let expires_at = now + policy.otp_ttl;
    invite.issue_code(otp.hash, expires_at, send_count, now);

    let email = OtpEmail {
        to: invite.email.clone(),
        code: otp.raw,
        garage_name: garage_name.to_string(),
    };
    Decision::new(
        SendOtpOutcome::Sent {
            expires_at,
            remaining_sends: policy.remaining_sends(send_count),
        },
        true,
    )
    .notify(Notification::OtpCode(email))
}

pub fn verify_otp(
    invite: &mut Invite,
    code: &str,
    policy: &InvitePolicy,
    now: DateTime<Utc>,
) -> Decision<VerifyOtpOutcome> {
    let dirty = invite.lift_elapsed_lock(policy, now);

    if policy.is_locked(invite, now) {
        let retry_after_seconds = policy.lock_retry_after(invite, now);
        return Decision::new(VerifyOtpOutcome::Locked { retry_after_seconds }, dirty);
    }

    if !codec::is_well_formed_code(code) {
        return Decision::new(VerifyOtpOutcome::MalformedCode, dirty);
    }

    let attempt = match invite.otp_state(now) {
        OtpState::Locked { until } => {
            let retry_after_seconds = seconds_until(until, now);
            return Decision::new(VerifyOtpOutcome::Locked { retry_after_seconds }, dirty);
        }
        OtpState::NoCodeIssued => return Decision::new(VerifyOtpOutcome::NoCodeSent, dirty),
        OtpState::CodeIssued { expires_at, .. } if expires_at <= now => {
            return Decision::new(VerifyOtpOutcome::CodeExpired, dirty);
        }
        OtpState::CodeIssued { hash, attempts, .. } => {
            policy.next_attempt_outcome(attempts, now, codec::matches(code, hash))
        }
    };

    let outcome = match attempt {
        AttemptOutcome::Verified => {
            let token = codec::generate_secret();
            let expires_at = now + policy.verification_ttl;
            invite.mark_verified(token.hash, expires_at);
            VerifyOtpOutcome::Verified {
                verification_token: token.raw,
                expires_at,
            }
        }
        AttemptOutcome::Invalid {
            attempts,
            remaining_attempts,
        } => {
            invite.record_failed_attempt(attempts);
            VerifyOtpOutcome::Invalid { remaining_attempts }
        }
        AttemptOutcome::Locked { attempts, until } => {
            invite.lock(attempts, until);
            VerifyOtpOutcome::Locked {
                retry_after_seconds: seconds_until(until, now),
            }
        }
    };
    Decision::new(outcome, true)
}

/// Guards of acceptance, in order. `Some(..)` is the outcome to report instead of accepting.
pub fn check_acceptance(
    invite: &Invite,
    request: &AcceptInviteDTO,
    policy: &InvitePolicy,
    now: DateTime<Utc>,
) -> Option<AcceptOutcome> {
    if request.verification_token.is_empty() {
        return Some(AcceptOutcome::VerificationRequired);
    }

    let verified = invite
        .verification_token
        .as_deref()
        .is_some_and(|stored| codec::matches(&request.verification_token, stored));
    if !verified {
        return Some(AcceptOutcome::InvalidVerification);
    }

    if invite
        .verification_token_expires_at
        .is_none_or(|expires_at| expires_at <= now)
    {
        return Some(AcceptOutcome::VerificationExpired);
    }

    if request.name.trim().is_empty() {
        return Some(AcceptOutcome::ValidationError(ValidationFailure::MissingName));
    }

    if request.password.is_empty() {
        return Some(AcceptOutcome::ValidationError(
            ValidationFailure::MissingPassword,
        ));
    }

    if request.password.chars().count() < policy.min_password_len {
        return Some(AcceptOutcome::ValidationError(
            ValidationFailure::PasswordTooShort {
                min: policy.min_password_len,
            },
        ));
    }

    None
}

/// Consumes the verification on this copy of the invite.
///
/// The guards of `check_acceptance` run on the same copy that gets saved, so a
/// reloaded invite is judged on its own verification state. A rejection is the
/// outcome and leaves the invite untouched.
pub fn accept(
    invite: &mut Invite,
    request: &AcceptInviteDTO,
    policy: &InvitePolicy,
    now: DateTime<Utc>,
) -> Decision<Option<AcceptOutcome>> {
    if let Some(rejection) = check_acceptance(invite, request, policy, now) {
        return Decision::new(Some(rejection), false);
    }
    invite.mark_accepted(now);
    Decision::new(None, true)
}

/// Rotates token and deadline; the outcome is the new raw token
pub fn resend(
    invite: &mut Invite,
    policy: &InvitePolicy,
    ctx: &MailContext,
    now: DateTime<Utc>,
) -> Decision<Secret> {
    let secret = codec::generate_secret();
    invite.rotate(secret.hash.clone(), now + policy.invite_ttl);
    let notification = invite_notification(invite, &secret.raw, ctx);
    Decision::new(secret, true).notify(notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invites::testing::pending_invite;
    use chrono::TimeDelta;

    fn accept_request(verification_token: &str) -> AcceptInviteDTO {
        AcceptInviteDTO {
            verification_token: verification_token.to_string(),
            name: "Bob Mechanic".to_string(),
            password: "password123".to_string(),
        }
    }

    /// Il codice in chiaro non è recuperabile dall'invito: ne installa uno noto
    fn with_known_code(invite: &mut Invite, now: DateTime<Utc>) -> String {
        let code = "123456".to_string();
        invite.otp_hash = Some(codec::hash_secret(&code));
        invite.otp_expires_at = Some(now + TimeDelta::minutes(10));
        code
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("bob@x.com"), "bo***@x.com");
        assert_eq!(mask_email("al@x.com"), "a***@x.com");
        assert_eq!(mask_email("a@x.com"), "a***@x.com");
        assert_eq!(mask_email("èlena@x.com"), "èl***@x.com");
    }

    #[test]
    fn test_invite_link_trims_trailing_slash() {
        assert_eq!(
            invite_link("https://app.example.com/", "abc"),
            "https://app.example.com/invite/abc"
        );
    }

    #[test]
    fn test_new_invite_expires_in_seven_days() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let (data, secret) = new_invite(1, 2, "bob@example.com", StaffRole::Mechanic, &policy, now);
        assert_eq!(data.expires_at, now + TimeDelta::days(7));
        assert_eq!(data.token_hash, codec::hash_secret(&secret.raw));
        assert_ne!(data.token_hash, secret.raw);
    }

    #[test]
    fn test_send_otp_issues_code_and_email() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);

        let decision = send_otp(&mut invite, &policy, "Test Garage", now);
        assert!(decision.dirty);
        assert_eq!(
            decision.outcome,
            SendOtpOutcome::Sent {
                expires_at: now + TimeDelta::minutes(10),
                remaining_sends: 4
            }
        );
        assert_eq!(invite.otp_send_count, 1);
        assert_eq!(invite.otp_attempts, 0);
        assert_eq!(invite.otp_last_sent_at, Some(now));

        let [Notification::OtpCode(email)] = decision.notifications.as_slice() else {
            panic!("expected one OTP email");
        };
        assert!(codec::matches(&email.code, invite.otp_hash.as_deref().unwrap()));
        assert_eq!(email.to, invite.email);
    }

    #[test]
    fn test_sixth_send_in_window_is_rate_limited() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);

        for _ in 0..5 {
            let decision = send_otp(&mut invite, &policy, "Test Garage", now);
            assert!(matches!(decision.outcome, SendOtpOutcome::Sent { .. }));
        }
        let hash_before = invite.otp_hash.clone();

        let decision = send_otp(&mut invite, &policy, "Test Garage", now);
        assert_eq!(
            decision.outcome,
            SendOtpOutcome::RateLimited {
                retry_after_seconds: 3600
            }
        );
        assert!(!decision.dirty);
        assert!(decision.notifications.is_empty());
        assert_eq!(invite.otp_hash, hash_before);
    }

    #[test]
    fn test_send_after_window_restarts_counter() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        invite.otp_send_count = 5;
        invite.otp_last_sent_at = Some(now - TimeDelta::minutes(61));

        let decision = send_otp(&mut invite, &policy, "Test Garage", now);
        assert!(matches!(
            decision.outcome,
            SendOtpOutcome::Sent {
                remaining_sends: 4,
                ..
            }
        ));
        assert_eq!(invite.otp_send_count, 1);
    }

    #[test]
    fn test_send_while_locked() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        invite.locked_until = Some(now + TimeDelta::minutes(20));

        let decision = send_otp(&mut invite, &policy, "Test Garage", now);
        assert_eq!(
            decision.outcome,
            SendOtpOutcome::Locked {
                retry_after_seconds: 1200
            }
        );
        assert!(!decision.dirty);
    }

    #[test]
    fn test_elapsed_lock_is_lifted_with_attempts() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        let code = with_known_code(&mut invite, now);
        invite.otp_attempts = 5;
        invite.locked_until = Some(now - TimeDelta::seconds(1));

        let decision = verify_otp(&mut invite, &code, &policy, now);
        assert!(matches!(decision.outcome, VerifyOtpOutcome::Verified { .. }));
        assert_eq!(invite.locked_until, None);
        assert_eq!(invite.otp_attempts, 0);
    }

    #[test]
    fn test_verify_rejects_malformed_code() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        with_known_code(&mut invite, now);

        let decision = verify_otp(&mut invite, "12a456", &policy, now);
        assert_eq!(decision.outcome, VerifyOtpOutcome::MalformedCode);
        assert!(!decision.dirty);
        assert_eq!(invite.otp_attempts, 0);
    }

    #[test]
    fn test_verify_without_code() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);

        let decision = verify_otp(&mut invite, "123456", &policy, now);
        assert_eq!(decision.outcome, VerifyOtpOutcome::NoCodeSent);
    }

    #[test]
    fn test_verify_expired_code() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        let code = with_known_code(&mut invite, now);
        invite.otp_expires_at = Some(now);

        let decision = verify_otp(&mut invite, &code, &policy, now);
        assert_eq!(decision.outcome, VerifyOtpOutcome::CodeExpired);
        assert_eq!(invite.otp_attempts, 0);
    }

    #[test]
    fn test_five_mismatches_lock_the_invite() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        let code = with_known_code(&mut invite, now);

        for remaining in (1..=4).rev() {
            let decision = verify_otp(&mut invite, "000000", &policy, now);
            assert_eq!(
                decision.outcome,
                VerifyOtpOutcome::Invalid {
                    remaining_attempts: remaining
                }
            );
            assert_eq!(invite.locked_until, None);
        }

        let decision = verify_otp(&mut invite, "000000", &policy, now);
        assert_eq!(
            decision.outcome,
            VerifyOtpOutcome::Locked {
                retry_after_seconds: 3600
            }
        );
        assert_eq!(invite.otp_attempts, 5);
        assert_eq!(invite.locked_until, Some(now + TimeDelta::hours(1)));

        // anche il codice giusto viene rifiutato durante il lock
        let decision = verify_otp(&mut invite, &code, &policy, now);
        assert!(matches!(decision.outcome, VerifyOtpOutcome::Locked { .. }));
        assert!(!decision.dirty);
    }

    #[test]
    fn test_verify_issues_single_use_verification() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        let code = with_known_code(&mut invite, now);
        invite.otp_attempts = 2;

        let decision = verify_otp(&mut invite, &code, &policy, now);
        let VerifyOtpOutcome::Verified {
            verification_token,
            expires_at,
        } = decision.outcome
        else {
            panic!("expected verification");
        };
        assert_eq!(expires_at, now + TimeDelta::minutes(10));
        assert!(codec::matches(
            &verification_token,
            invite.verification_token.as_deref().unwrap()
        ));
        assert_eq!(invite.otp_hash, None);
        assert_eq!(invite.otp_attempts, 0);

        // il codice è consumato
        let decision = verify_otp(&mut invite, &code, &policy, now);
        assert_eq!(decision.outcome, VerifyOtpOutcome::NoCodeSent);
    }

    #[test]
    fn test_acceptance_guards_in_order() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);

        assert!(matches!(
            check_acceptance(&invite, &accept_request(""), &policy, now),
            Some(AcceptOutcome::VerificationRequired)
        ));
        assert!(matches!(
            check_acceptance(&invite, &accept_request("whatever"), &policy, now),
            Some(AcceptOutcome::InvalidVerification)
        ));

        let token = codec::generate_secret();
        invite.verification_token = Some(token.hash.clone());
        invite.verification_token_expires_at = Some(now + TimeDelta::minutes(10));
        assert!(matches!(
            check_acceptance(&invite, &accept_request("whatever"), &policy, now),
            Some(AcceptOutcome::InvalidVerification)
        ));
        assert!(check_acceptance(&invite, &accept_request(&token.raw), &policy, now).is_none());

        let mut request = accept_request(&token.raw);
        request.name = "   ".to_string();
        assert!(matches!(
            check_acceptance(&invite, &request, &policy, now),
            Some(AcceptOutcome::ValidationError(ValidationFailure::MissingName))
        ));

        let mut request = accept_request(&token.raw);
        request.password = String::new();
        let rejection = check_acceptance(&invite, &request, &policy, now);
        assert!(matches!(
            rejection,
            Some(AcceptOutcome::ValidationError(
                ValidationFailure::MissingPassword
            ))
        ));
        if let Some(AcceptOutcome::ValidationError(failure)) = rejection {
            assert_eq!(failure.message(), "Password is required");
        }

        let mut request = accept_request(&token.raw);
        request.password = "short".to_string();
        assert!(matches!(
            check_acceptance(&invite, &request, &policy, now),
            Some(AcceptOutcome::ValidationError(
                ValidationFailure::PasswordTooShort { min: 8 }
            ))
        ));

        invite.verification_token_expires_at = Some(now);
        assert!(matches!(
            check_acceptance(&invite, &accept_request(&token.raw), &policy, now),
            Some(AcceptOutcome::VerificationExpired)
        ));
    }

    #[test]
    fn test_accept_consumes_verification_once() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now);
        let token = codec::generate_secret();
        invite.verification_token = Some(token.hash.clone());
        invite.verification_token_expires_at = Some(now + TimeDelta::minutes(10));

        // rifiutato: invito intatto
        let decision = accept(&mut invite, &accept_request("whatever"), &policy, now);
        assert!(!decision.dirty);
        assert!(matches!(
            decision.outcome,
            Some(AcceptOutcome::InvalidVerification)
        ));
        assert_eq!(invite.used_at, None);
        assert!(invite.is_verified());

        let decision = accept(&mut invite, &accept_request(&token.raw), &policy, now);
        assert!(decision.dirty);
        assert!(decision.outcome.is_none());
        assert_eq!(invite.status, InviteStatus::Accepted);
        assert_eq!(invite.used_at, Some(now));
        assert_eq!(invite.verification_token, None);
        assert_eq!(invite.lifecycle(now), Lifecycle::Accepted);

        // lo stesso token non passa una seconda volta
        let later = now + TimeDelta::minutes(1);
        let decision = accept(&mut invite, &accept_request(&token.raw), &policy, later);
        assert!(!decision.dirty);
        assert!(matches!(
            decision.outcome,
            Some(AcceptOutcome::InvalidVerification)
        ));
        assert_eq!(invite.used_at, Some(now));
    }

    #[test]
    fn test_resend_resets_everything() {
        let now = Utc::now();
        let policy = InvitePolicy::default();
        let mut invite = pending_invite(now - TimeDelta::days(3));
        let old_hash = invite.token_hash.clone();
        invite.otp_hash = Some("h".to_string());
        invite.otp_expires_at = Some(now);
        invite.otp_attempts = 5;
        invite.otp_send_count = 5;
        invite.otp_last_sent_at = Some(now);
        invite.locked_until = Some(now + TimeDelta::hours(1));
        invite.verification_token = Some("v".to_string());
        invite.verification_token_expires_at = Some(now);

        let ctx = MailContext {
            garage_name: "Test Garage".to_string(),
            inviter_name: Some("Alice".to_string()),
            public_url: "http://localhost:5173".to_string(),
        };
        let decision = resend(&mut invite, &policy, &ctx, now);
        let secret = &decision.outcome;

        assert_ne!(invite.token_hash, old_hash);
        assert!(codec::matches(&secret.raw, &invite.token_hash));
        assert_eq!(invite.expires_at, now + TimeDelta::days(7));
        assert_eq!(invite.otp_state(now), OtpState::NoCodeIssued);
        assert_eq!(invite.otp_attempts, 0);
        assert_eq!(invite.otp_send_count, 0);
        assert_eq!(invite.otp_last_sent_at, None);
        assert_eq!(invite.locked_until, None);
        assert!(!invite.is_verified());

        let [Notification::Invite(email)] = decision.notifications.as_slice() else {
            panic!("expected one invite email");
        };
        assert_eq!(
            email.invite_link,
            format!("http://localhost:5173/invite/{}", secret.raw)
        );
        assert_eq!(email.inviter_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_ensure_active_rejects_settled_invites() {
        let now = Utc::now();
        let mut invite = pending_invite(now);
        assert!(ensure_active(&invite, now).is_ok());

        invite.expires_at = now;
        assert!(matches!(
            ensure_active(&invite, now),
            Err(InviteError::Superseded(_))
        ));
    }
}
