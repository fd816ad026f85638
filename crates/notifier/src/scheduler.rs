//! Retry scheduler: puts due notifications back on the queue.
//!
//! A single periodic task queries the store for pending notifications whose
//! retry time has arrived, plus never-attempted ones older than the orphan
//! grace period (e.g. submissions rejected because the queue was full), and
//! enqueues them. It never modifies records itself. A notification that
//! cannot be enqueued stays as it is and is picked up by a later sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::dispatcher::Shared;
use crate::error::{DispatchError, StoreError};
use crate::sender::MessageSender;
use crate::store::NotificationStore;

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Due retries found in the store.
    pub due: usize,
    /// Never-attempted notifications past the orphan grace period.
    pub orphaned: usize,
    pub enqueued: usize,
    /// Already queued or being delivered.
    pub already_queued: usize,
    /// Left in the store for a later sweep (queue full or dispatcher stopped).
    pub deferred: usize,
}

impl<S, M> Shared<S, M>
where
    S: NotificationStore,
    M: MessageSender,
{
    /// Resubmit everything that is due at `now`.
    pub(crate) async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let due = self.store.query_due_retries(now).await?;
        let orphaned = match now.checked_sub_signed(self.config.orphan_grace) {
            Some(cutoff) => self.store.query_orphaned(cutoff).await?,
            None => Vec::new(),
        };

        let mut report = SweepReport {
            due: due.len(),
            orphaned: orphaned.len(),
            ..SweepReport::default()
        };

        for notification in due.into_iter().chain(orphaned) {
            let id = notification.id;
            match self.enqueue(notification) {
                Ok(()) => report.enqueued += 1,
                Err(DispatchError::AlreadyQueued(_)) => report.already_queued += 1,
                Err(e) => {
                    report.deferred += 1;
                    tracing::debug!(notification_id = %id, error = %e, "Retry deferred to next sweep");
                }
            }
        }

        Ok(report)
    }
}

/// Scheduler loop: sweeps immediately, then every `retry_interval` until
/// `shutdown` fires.
pub(crate) async fn run_scheduler<S, M>(shared: Arc<Shared<S, M>>, mut shutdown: watch::Receiver<bool>)
where
    S: NotificationStore,
    M: MessageSender,
{
    let mut ticker = tokio::time::interval(shared.config.retry_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(
        interval_secs = shared.config.retry_interval.as_secs(),
        "Retry scheduler started"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                match shared.sweep(Utc::now()).await {
                    Ok(report) if report.due + report.orphaned > 0 => {
                        tracing::info!(
                            due = report.due,
                            orphaned = report.orphaned,
                            enqueued = report.enqueued,
                            already_queued = report.already_queued,
                            deferred = report.deferred,
                            "Retry sweep completed"
                        );
                    }
                    Ok(_) => tracing::trace!("Retry sweep found nothing due"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Retry sweep failed, will try again next interval");
                    }
                }
            }
        }
    }

    tracing::debug!("Retry scheduler stopped");
}
