//! Delivery transports.
//!
//! The dispatcher only needs "attempt to send, report success or failure".
//! Timeouts belong to the transport.

mod logging;
mod resend;

use std::future::Future;

use hrdesk_common::config::AppConfig;
use hrdesk_common::types::Recipient;

use crate::error::SendError;

pub use logging::LogSender;
pub use resend::ResendSender;

/// A transport able to deliver one message.
pub trait MessageSender: Send + Sync + 'static {
    fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// Sender selected from configuration at startup.
#[derive(Debug, Clone)]
pub enum ConfiguredSender {
    Resend(ResendSender),
    Log(LogSender),
}

impl ConfiguredSender {
    /// Use Resend when an API key is configured, otherwise only log messages.
    pub fn from_config(config: &AppConfig) -> Result<Self, SendError> {
        match (&config.resend_api_key, &config.email_from) {
            (Some(api_key), Some(from)) => Ok(Self::Resend(ResendSender::new(
                api_key.clone(),
                from.clone(),
            )?)),
            (Some(_), None) => Err(SendError::new(
                "EMAIL_FROM is required when RESEND_API_KEY is set",
            )),
            (None, _) => {
                tracing::warn!("RESEND_API_KEY not set — notifications will only be logged");
                Ok(Self::Log(LogSender))
            }
        }
    }
}

impl MessageSender for ConfiguredSender {
    async fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), SendError> {
        match self {
            Self::Resend(sender) => sender.send(recipient, subject, body).await,
            Self::Log(sender) => sender.send(recipient, subject, body).await,
        }
    }
}
