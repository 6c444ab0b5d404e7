//! LogMailer - scrive le email nei log invece di inviarle

use super::templates;
use super::{InviteEmail, NotifyError, Notifier, OtpEmail};
use tracing::{info, instrument};

/// Used when no provider API key is configured. Never fails.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Notifier for LogMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send_invite_email(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        let rendered = templates::invite(email);
        info!(
            "Email would be sent: subject={:?} link={}",
            rendered.subject, email.invite_link
        );
        Ok(())
    }

    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send_otp_email(&self, email: &OtpEmail) -> Result<(), NotifyError> {
        let rendered = templates::otp(email);
        info!("Email would be sent: subject={:?}", rendered.subject);
        Ok(())
    }
}
