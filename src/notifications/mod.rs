//! Notifications module - Porta di notifica email
//!
//! The invite state machine emits `Notification` intents; they are delivered
//! through a `Notifier` only after the invite has been committed.
//! - `ResendMailer`: delivery through the Resend HTTP API, with retry
//! - `LogMailer`: logs the email instead of sending it (no API key configured)
//! - `MemoryOutbox`: keeps the emails in memory

pub mod logger;
pub mod outbox;
pub mod resend;
pub mod retry;
mod templates;

pub use logger::LogMailer;
pub use outbox::MemoryOutbox;
pub use resend::ResendMailer;
pub use retry::RetryConfig;

use crate::entities::StaffRole;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The provider refused the message; retrying would not help
    #[error("email rejected by provider (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Every retry failed on 429/5xx or on the network
    #[error("email delivery failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteEmail {
    pub to: String,
    pub garage_name: String,
    pub role: StaffRole,
    pub invite_link: String,
    pub inviter_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpEmail {
    pub to: String,
    pub code: String,
    pub garage_name: String,
}

/// Email to deliver once the state change is durable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Invite(InviteEmail),
    OtpCode(OtpEmail),
}

/// Outbound email capability
pub trait Notifier: Send + Sync + 'static {
    fn send_invite_email(
        &self,
        email: &InviteEmail,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;

    fn send_otp_email(&self, email: &OtpEmail)
    -> impl Future<Output = Result<(), NotifyError>> + Send;

    fn deliver(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        async move {
            match notification {
                Notification::Invite(email) => self.send_invite_email(email).await,
                Notification::OtpCode(email) => self.send_otp_email(email).await,
            }
        }
    }
}

/// Notifier selected from configuration
pub enum Mailer {
    Resend(ResendMailer),
    Log(LogMailer),
}

impl Notifier for Mailer {
    async fn send_invite_email(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        match self {
            Mailer::Resend(mailer) => mailer.send_invite_email(email).await,
            Mailer::Log(mailer) => mailer.send_invite_email(email).await,
        }
    }

    async fn send_otp_email(&self, email: &OtpEmail) -> Result<(), NotifyError> {
        match self {
            Mailer::Resend(mailer) => mailer.send_otp_email(email).await,
            Mailer::Log(mailer) => mailer.send_otp_email(email).await,
        }
    }
}
