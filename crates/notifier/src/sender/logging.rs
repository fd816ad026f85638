use hrdesk_common::types::Recipient;

use super::MessageSender;
use crate::error::SendError;

/// Writes each message to the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

impl MessageSender for LogSender {
    async fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), SendError> {
        tracing::info!(
            recipient = %recipient,
            subject,
            body_len = body.len(),
            "Notification delivered to log sender"
        );
        Ok(())
    }
}
