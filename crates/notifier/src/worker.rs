//! Delivery workers.
//!
//! Each worker takes one notification at a time from the dispatch queue,
//! hands it to the sender and persists the outcome. A worker exits only
//! once the queue is closed and empty, so stopping the dispatcher never
//! discards a queued notification.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use hrdesk_common::types::{DeliveryStatus, Notification};

use crate::backoff::retry_delay;
use crate::dispatcher::Shared;
use crate::error::{SendError, StoreError};
use crate::queue::QueueReceiver;
use crate::sender::MessageSender;
use crate::store::NotificationStore;

/// What a single delivery attempt means for the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Delivered. Terminal.
    Sent { sent_at: DateTime<Utc> },
    /// Failed with attempts left; try again at `next_retry_at`.
    RetryScheduled {
        retry_count: i32,
        next_retry_at: DateTime<Utc>,
        error: String,
    },
    /// Failed and `retry_count` reached `max_retries`. Terminal.
    Failed { retry_count: i32, error: String },
}

impl AttemptOutcome {
    /// Decide the outcome of an attempt on `notification` finished at `now`.
    pub fn evaluate(
        notification: &Notification,
        result: Result<(), SendError>,
        now: DateTime<Utc>,
    ) -> Self {
        let error = match result {
            Ok(()) => return AttemptOutcome::Sent { sent_at: now },
            Err(e) => e.to_string(),
        };

        let max_retries = notification.max_retries.max(1);
        let retry_count = notification.retry_count.saturating_add(1).min(max_retries);

        if retry_count >= max_retries {
            AttemptOutcome::Failed { retry_count, error }
        } else {
            AttemptOutcome::RetryScheduled {
                retry_count,
                next_retry_at: now + retry_delay(retry_count),
                error,
            }
        }
    }
}

/// Worker loop: runs until the queue is closed and drained.
pub(crate) async fn run_worker<S, M>(worker: usize, receiver: QueueReceiver, shared: Arc<Shared<S, M>>)
where
    S: NotificationStore,
    M: MessageSender,
{
    tracing::debug!(worker, "Notification worker started");

    while let Some(notification) = receiver.next().await {
        let id = notification.id;
        deliver(worker, &shared, notification).await;
        shared.release(id);
    }

    tracing::debug!(worker, "Queue closed and drained, worker exiting");
}

/// Attempt one delivery and persist its outcome.
async fn deliver<S, M>(worker: usize, shared: &Arc<Shared<S, M>>, notification: Notification)
where
    S: NotificationStore,
    M: MessageSender,
{
    if !still_current(worker, shared, &notification).await {
        return;
    }

    // A panic inside the transport surfaces as a failed attempt.
    let attempt = {
        let shared = Arc::clone(shared);
        let message = notification.clone();
        tokio::spawn(async move {
            shared
                .sender
                .send(&message.recipient, &message.subject, &message.body)
                .await
        })
    };
    let result = match attempt.await {
        Ok(result) => result,
        Err(e) => Err(SendError::new(format!("sender task failed: {}", e))),
    };

    let outcome = AttemptOutcome::evaluate(&notification, result, Utc::now());
    if let Err(e) = persist(shared, &notification, &outcome).await {
        shared.counters.record_persistence_error();
        tracing::error!(
            worker,
            notification_id = %notification.id,
            outcome = ?outcome,
            error = %e,
            "Failed to persist delivery outcome"
        );
    }
}

/// Whether the stored record still matches the queued copy.
///
/// A sweep may queue a copy it read just before another worker finished the
/// same notification. Such a copy is dropped here instead of being sent again.
async fn still_current<S, M>(worker: usize, shared: &Shared<S, M>, queued: &Notification) -> bool
where
    S: NotificationStore,
    M: MessageSender,
{
    match shared.store.find(queued.id).await {
        Ok(Some(stored))
            if stored.status == DeliveryStatus::Pending && stored.version == queued.version =>
        {
            true
        }
        Ok(stored) => {
            shared.counters.record_stale_skipped();
            tracing::debug!(
                worker,
                notification_id = %queued.id,
                queued_version = queued.version,
                stored_version = ?stored.as_ref().map(|n| n.version),
                stored_status = ?stored.as_ref().map(|n| n.status),
                "Dropping stale queued copy"
            );
            false
        }
        Err(e) => {
            shared.counters.record_persistence_error();
            tracing::error!(
                worker,
                notification_id = %queued.id,
                error = %e,
                "Failed to load notification before delivery, left for the retry scheduler"
            );
            false
        }
    }
}

async fn persist<S, M>(
    shared: &Shared<S, M>,
    notification: &Notification,
    outcome: &AttemptOutcome,
) -> Result<(), StoreError>
where
    S: NotificationStore,
    M: MessageSender,
{
    let id = notification.id;
    let version = notification.version;

    match outcome {
        AttemptOutcome::Sent { sent_at } => {
            shared.store.mark_sent(id, version, *sent_at).await?;
            shared.counters.record_sent();
            tracing::info!(
                notification_id = %id,
                event_type = %notification.event_type,
                retry_count = notification.retry_count,
                "Notification sent"
            );
        }
        AttemptOutcome::RetryScheduled {
            retry_count,
            next_retry_at,
            error,
        } => {
            shared
                .store
                .schedule_retry(id, version, *retry_count, *next_retry_at, error)
                .await?;
            shared.counters.record_retry_scheduled();
            tracing::warn!(
                notification_id = %id,
                retry_count,
                max_retries = notification.max_retries,
                next_retry_at = %next_retry_at,
                error = %error,
                "Notification delivery failed — retry scheduled"
            );
        }
        AttemptOutcome::Failed { retry_count, error } => {
            shared
                .store
                .mark_failed(id, version, *retry_count, error)
                .await?;
            shared.counters.record_failed();
            tracing::error!(
                notification_id = %id,
                event_type = %notification.event_type,
                retry_count,
                error = %error,
                "Notification delivery failed permanently"
            );
        }
    }

    Ok(())
}
