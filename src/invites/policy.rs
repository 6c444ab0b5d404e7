//! Rate/lockout policy - funzioni pure su contatori e timestamp dell'invito
//!
//! Nothing here touches storage; the state machine applies the decisions.

use crate::entities::Invite;
use chrono::{DateTime, TimeDelta, Utc};

/// Limits and lifetimes of the invite flow
#[derive(Debug, Clone)]
pub struct InvitePolicy {
    pub invite_ttl: TimeDelta,
    pub otp_ttl: TimeDelta,
    pub verification_ttl: TimeDelta,
    /// failed verifications that trigger the lock
    pub max_otp_attempts: i32,
    pub lockout: TimeDelta,
    /// codes that may be sent inside one send window
    pub max_otp_sends: i32,
    pub send_window: TimeDelta,
    pub min_password_len: usize,
}

impl Default for InvitePolicy {
    fn default() -> Self {
        Self {
            invite_ttl: TimeDelta::days(7),
            otp_ttl: TimeDelta::minutes(10),
            verification_ttl: TimeDelta::minutes(10),
            max_otp_attempts: 5,
            lockout: TimeDelta::hours(1),
            max_otp_sends: 5,
            send_window: TimeDelta::hours(1),
            min_password_len: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDecision {
    Allowed,
    Blocked { retry_after_seconds: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Verified,
    Invalid {
        attempts: i32,
        remaining_attempts: i32,
    },
    Locked {
        attempts: i32,
        until: DateTime<Utc>,
    },
}

/// Whole seconds from `now` to `deadline`, rounded up, never negative
pub fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds().max(0);
    (millis + 999) / 1000
}

impl InvitePolicy {
    pub fn is_locked(&self, invite: &Invite, now: DateTime<Utc>) -> bool {
        invite.locked_until().is_some_and(|until| until > now)
    }

    /// A lock whose deadline has passed and is still on the record
    pub fn lock_elapsed(&self, invite: &Invite, now: DateTime<Utc>) -> bool {
        invite.locked_until().is_some_and(|until| until <= now)
    }

    pub fn lock_retry_after(&self, invite: &Invite, now: DateTime<Utc>) -> i64 {
        invite
            .locked_until()
            .map(|until| seconds_until(until, now))
            .unwrap_or(0)
    }

    fn in_send_window(&self, last_sent_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_sent_at.is_some_and(|last| last > now - self.send_window)
    }

    pub fn can_send_otp(&self, invite: &Invite, now: DateTime<Utc>) -> SendDecision {
        let last_sent_at = invite.otp_last_sent_at();
        if self.in_send_window(last_sent_at, now) && invite.otp_send_count() >= self.max_otp_sends {
            // in_send_window guarantees last_sent_at is set
            let window_end = last_sent_at.unwrap_or(now) + self.send_window;
            return SendDecision::Blocked {
                retry_after_seconds: seconds_until(window_end, now),
            };
        }
        SendDecision::Allowed
    }

    /// Send counter to build on for the next send: 0 once the window has rolled over
    pub fn roll_send_window(&self, invite: &Invite, now: DateTime<Utc>) -> i32 {
        if self.in_send_window(invite.otp_last_sent_at(), now) {
            invite.otp_send_count()
        } else {
            0
        }
    }

    pub fn remaining_sends(&self, send_count: i32) -> i32 {
        (self.max_otp_sends - send_count).max(0)
    }

    /// Outcome of one verification attempt, given the failures recorded so far
    pub fn next_attempt_outcome(
        &self,
        attempts: i32,
        now: DateTime<Utc>,
        code_matches: bool,
    ) -> AttemptOutcome {
        if code_matches {
            return AttemptOutcome::Verified;
        }
        let attempts = attempts + 1;
        if attempts >= self.max_otp_attempts {
            AttemptOutcome::Locked {
                attempts,
                until: now + self.lockout,
            }
        } else {
            AttemptOutcome::Invalid {
                attempts,
                remaining_attempts: self.max_otp_attempts - attempts,
            }
        }
    }
}
