//! Confirmation mail delivery.
//!
//! Bookings trigger a fire-and-forget confirmation email through an HTTP
//! mail relay. Failures are logged by the caller and never affect the
//! booking outcome. When no relay is configured, `NoopMailer` keeps local
//! runs working.

use async_trait::async_trait;
use serde::Serialize;

use slotcast_domain::Holder;

use super::ports::{MailerError, MailerPort};

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// HTTP mail relay client.
pub struct RelayMailer {
    client: reqwest::Client,
    base_url: String,
    token: String,
    from: String,
}

impl RelayMailer {
    pub fn new(base_url: &str, token: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl MailerPort for RelayMailer {
    async fn send_confirmation(&self, holder: &Holder) -> Result<(), MailerError> {
        let message = RelayMessage {
            from: &self.from,
            to: &holder.email,
            subject: "Appointment Confirmation",
            text: format!("Hello {}, your appointment is confirmed.", holder.name),
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.token)
            .json(&message)
            .send()
            .await
            .map_err(|e| MailerError::Relay(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailerError::Relay(format!(
                "relay returned {}",
                response.status()
            )));
        }

        tracing::debug!(to = %holder.email, "Confirmation email accepted by relay");
        Ok(())
    }
}

/// Mailer used when no relay is configured.
pub struct NoopMailer;

#[async_trait]
impl MailerPort for NoopMailer {
    async fn send_confirmation(&self, holder: &Holder) -> Result<(), MailerError> {
        tracing::info!(
            to = %holder.email,
            "Mail relay not configured, skipping confirmation email"
        );
        Ok(())
    }
}
