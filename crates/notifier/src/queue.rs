//! Bounded in-memory dispatch queue.
//!
//! Producers push with [`DispatchQueue::try_push`], which never waits: a full
//! buffer is reported immediately. Workers share one [`QueueReceiver`]; each
//! queued notification is handed to exactly one of them. Once every
//! `DispatchQueue` handle is dropped the receiver yields the remaining items
//! and then `None`.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use hrdesk_common::types::Notification;

/// Why a push was rejected. The notification is handed back to the caller.
#[derive(Debug)]
pub(crate) enum PushError {
    Full(Notification),
    Closed(Notification),
}

/// Producer side of the queue.
#[derive(Debug)]
pub(crate) struct DispatchQueue {
    tx: mpsc::Sender<Notification>,
}

/// Consumer side of the queue, cloned into every worker.
#[derive(Debug, Clone)]
pub(crate) struct QueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Notification>>>,
}

/// Create a queue holding at most `capacity` notifications.
///
/// `capacity` must be non-zero.
pub(crate) fn bounded(capacity: usize) -> (DispatchQueue, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        DispatchQueue { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

impl DispatchQueue {
    pub(crate) fn try_push(&self, notification: Notification) -> Result<(), PushError> {
        self.tx.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(n) => PushError::Full(n),
            mpsc::error::TrySendError::Closed(n) => PushError::Closed(n),
        })
    }

    /// Number of notifications waiting for a worker.
    pub(crate) fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl QueueReceiver {
    /// Wait for the next notification. Returns `None` once the queue is
    /// closed and drained.
    pub(crate) async fn next(&self) -> Option<Notification> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
