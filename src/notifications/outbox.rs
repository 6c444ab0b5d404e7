//! MemoryOutbox - raccoglie le email in memoria invece di inviarle

use super::{InviteEmail, Notification, NotifyError, Notifier, OtpEmail};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Keeps every delivered email; can be switched to fail like an unreachable provider.
/// Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutbox {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Most recent OTP code sent to `to`
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|n| match n {
            Notification::OtpCode(email) if email.to == to => Some(email.code),
            _ => None,
        })
    }

    /// Most recent invite link sent to `to`
    pub fn last_link_for(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|n| match n {
            Notification::Invite(email) if email.to == to => Some(email.invite_link),
            _ => None,
        })
    }

    fn push(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: 503,
                message: "outbox offline".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification);
        }
        Ok(())
    }
}

impl Notifier for MemoryOutbox {
    async fn send_invite_email(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        self.push(Notification::Invite(email.clone()))
    }

    async fn send_otp_email(&self, email: &OtpEmail) -> Result<(), NotifyError> {
        self.push(Notification::OtpCode(email.clone()))
    }
}
