use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// `Sent` and `Failed` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Sent | DeliveryStatus::Failed)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipient {
    #[sqlx(rename = "recipient_email")]
    pub email: String,
    #[sqlx(rename = "recipient_name")]
    pub name: String,
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.email)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

/// A transactional message tracked from creation to delivery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    #[sqlx(flatten)]
    pub recipient: Recipient,
    /// Producer-defined tag, e.g. `leave_applied`.
    pub event_type: String,
    pub subject: String,
    pub body: String,
    pub status: DeliveryStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter, bumped by every status update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Producer-supplied fields for a notification that has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient: Recipient,
    pub event_type: String,
    pub subject: String,
    pub body: String,
    pub max_retries: i32,
}

impl NewNotification {
    /// Check the fields a delivery attempt depends on.
    pub fn validate(&self) -> Result<(), String> {
        if self.recipient.email.trim().is_empty() || !self.recipient.email.contains('@') {
            return Err(format!(
                "Invalid recipient email '{}'",
                self.recipient.email
            ));
        }
        if self.subject.trim().is_empty() {
            return Err("Subject must not be empty".to_string());
        }
        if self.event_type.trim().is_empty() {
            return Err("Event type must not be empty".to_string());
        }
        if self.max_retries < 1 {
            return Err(format!(
                "max_retries must be at least 1, got {}",
                self.max_retries
            ));
        }
        Ok(())
    }
}
