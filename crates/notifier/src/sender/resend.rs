use std::time::Duration;

use serde_json::json;

use hrdesk_common::types::Recipient;

use super::MessageSender;
use crate::error::SendError;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Per-request timeout; a hung request counts as a failed attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Email delivery through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl ResendSender {
    pub fn new(api_key: String, from: String) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            from,
            endpoint: RESEND_API_URL.to_string(),
        })
    }

    /// Point the sender at a different API base, e.g. a local mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, recipient: &Recipient, subject: &str, body: &str) -> serde_json::Value {
        json!({
            "from": self.from,
            "to": [recipient.to_string()],
            "subject": subject,
            "text": body,
        })
    }
}

impl MessageSender for ResendSender {
    async fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(recipient, subject, body))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(recipient = %recipient.email, "Email accepted by Resend");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(SendError::new(format!(
            "Resend rejected email with status {}: {}",
            status, detail
        )))
    }
}
