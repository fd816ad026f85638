use thiserror::Error;
use uuid::Uuid;

use hrdesk_common::error::AppError;

/// Errors returned by the dispatcher's public operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification dispatcher is not running")]
    NotRunning,

    #[error("Notification dispatcher is already running")]
    AlreadyRunning,

    #[error("Notification {0} is already queued or being delivered")]
    AlreadyQueued(Uuid),

    #[error("Invalid dispatcher configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    #[error("Dispatcher must be started from within a Tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure reported by a [`MessageSender`](crate::sender::MessageSender).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SendError(pub String);

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

/// Errors raised by a [`NotificationStore`](crate::store::NotificationStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The version or status guard rejected an update: the record changed
    /// since it was read, or it already reached a terminal status.
    #[error("Notification {id} was modified concurrently or is no longer pending")]
    Conflict { id: Uuid },

    #[error("Notification {id} not found")]
    NotFound { id: Uuid },
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::QueueFull | DispatchError::NotRunning => {
                AppError::Unavailable(e.to_string())
            }
            DispatchError::InvalidNotification(msg) => AppError::Validation(msg),
            DispatchError::Store(StoreError::NotFound { id }) => {
                AppError::NotFound(format!("Notification {} not found", id))
            }
            DispatchError::Store(StoreError::Database(db)) => AppError::Database(db),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        DispatchError::Store(e).into()
    }
}
