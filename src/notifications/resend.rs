//! ResendMailer - invio tramite API HTTP di Resend con retry e backoff esponenziale

use super::templates::{self, RenderedEmail};
use super::{InviteEmail, NotifyError, Notifier, OtpEmail, RetryConfig};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
    retry: RetryConfig,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            endpoint: RESEND_API_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// 429 e 5xx vengono ritentati, gli altri 4xx no
    #[instrument(skip(self, rendered), fields(subject = %rendered.subject))]
    async fn send(&self, to: &str, rendered: &RenderedEmail) -> Result<(), NotifyError> {
        let payload = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject: &rendered.subject,
            html: &rendered.html,
            text: &rendered.text,
        };

        let mut last_error = String::new();
        for attempt in 1..=self.retry.max_attempts {
            debug!("Sending email, attempt {}/{}", attempt, self.retry.max_attempts);
            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!("Email sent");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    if !RetryConfig::is_retryable_status(status) {
                        error!("Non-retryable email error {}: {}", status, message);
                        return Err(NotifyError::Rejected { status, message });
                    }
                    warn!(
                        "Attempt {}/{} failed with status {}",
                        attempt, self.retry.max_attempts, status
                    );
                    last_error = format!("status {}: {}", status, message);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: {}",
                        attempt, self.retry.max_attempts, e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry.max_attempts {
                let delay = self.retry.backoff_for(attempt);
                debug!("Retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        error!("All retry attempts failed");
        Err(NotifyError::Exhausted {
            attempts: self.retry.max_attempts,
            last_error,
        })
    }
}

impl Notifier for ResendMailer {
    async fn send_invite_email(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        self.send(&email.to, &templates::invite(email)).await
    }

    async fn send_otp_email(&self, email: &OtpEmail) -> Result<(), NotifyError> {
        self.send(&email.to, &templates::otp(email)).await
    }
}
