//! Dispatcher lifecycle and the producer-facing entry points.
//!
//! ```text
//! producer ──submit──▶ store.create ──enqueue──▶ [bounded queue] ──▶ N workers ──▶ sender
//!                                                   ▲                               │
//!                          retry scheduler ─────────┘            store.mark_* ◀─────┘
//! ```
//!
//! States are `Stopped` and `Running`; one mutex guards every transition and
//! every `enqueue`, so a notification is never accepted after `stop` begins.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use hrdesk_common::config::AppConfig;
use hrdesk_common::types::{NewNotification, Notification};

use crate::error::DispatchError;
use crate::queue::{self, DispatchQueue, PushError};
use crate::scheduler::{self, SweepReport};
use crate::sender::MessageSender;
use crate::stats::{Counters, QueueStats};
use crate::store::NotificationStore;
use crate::worker;

/// Default capacity of the dispatch queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default interval between retry sweeps (2 minutes).
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(120);

/// Default age after which a never-attempted notification is re-queued.
pub const DEFAULT_ORPHAN_GRACE_SECS: i64 = 60;

/// Default delivery attempts for a notification.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Tuning for a [`NotificationDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub queue_capacity: usize,
    pub retry_interval: Duration,
    pub orphan_grace: TimeDelta,
    pub default_max_retries: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            orphan_grace: TimeDelta::seconds(DEFAULT_ORPHAN_GRACE_SECS),
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl DispatcherConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            queue_capacity: config.notifier_queue_capacity,
            retry_interval: Duration::from_secs(config.notifier_retry_interval_secs),
            orphan_grace: i64::try_from(config.notifier_orphan_grace_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            default_max_retries: config.notifier_max_retries,
        }
    }
}

struct Running {
    queue: DispatchQueue,
    workers: Vec<JoinHandle<()>>,
    scheduler: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

enum Lifecycle {
    Stopped,
    Running(Running),
}

/// State shared between the dispatcher handle, its workers and the scheduler.
pub(crate) struct Shared<S, M> {
    pub(crate) store: S,
    pub(crate) sender: M,
    pub(crate) config: DispatcherConfig,
    pub(crate) counters: Counters,
    state: Mutex<Lifecycle>,
    /// Ids currently queued or being delivered.
    in_flight: Mutex<HashSet<Uuid>>,
}

impl<S, M> Shared<S, M> {
    fn lock_state(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a notification on the queue without waiting.
    pub(crate) fn enqueue(&self, notification: Notification) -> Result<(), DispatchError> {
        let state = self.lock_state();
        let Lifecycle::Running(running) = &*state else {
            return Err(DispatchError::NotRunning);
        };

        if notification.status.is_terminal() {
            return Err(DispatchError::InvalidNotification(format!(
                "notification {} is already {}",
                notification.id, notification.status
            )));
        }

        let id = notification.id;
        let mut in_flight = self.lock_in_flight();
        if in_flight.contains(&id) {
            return Err(DispatchError::AlreadyQueued(id));
        }

        match running.queue.try_push(notification) {
            Ok(()) => {
                in_flight.insert(id);
                Ok(())
            }
            Err(PushError::Full(_)) => Err(DispatchError::QueueFull),
            Err(PushError::Closed(_)) => Err(DispatchError::NotRunning),
        }
    }

    /// Hand ownership of a notification back to the store.
    pub(crate) fn release(&self, id: Uuid) {
        self.lock_in_flight().remove(&id);
    }
}

/// Asynchronous notification dispatcher: bounded queue, worker pool and
/// retry scheduler over a [`NotificationStore`] and a [`MessageSender`].
pub struct NotificationDispatcher<S, M>
where
    S: NotificationStore,
    M: MessageSender,
{
    shared: Arc<Shared<S, M>>,
}

impl<S, M> NotificationDispatcher<S, M>
where
    S: NotificationStore,
    M: MessageSender,
{
    /// Create a stopped dispatcher.
    pub fn new(store: S, sender: M, config: DispatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                sender,
                config,
                counters: Counters::default(),
                state: Mutex::new(Lifecycle::Stopped),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// Spawn `num_workers` workers and the retry scheduler on the current
    /// Tokio runtime.
    pub fn start(&self, num_workers: usize) -> Result<(), DispatchError> {
        if num_workers == 0 {
            return Err(DispatchError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        let capacity = self.shared.config.queue_capacity;
        if capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.shared.config.retry_interval.is_zero() {
            return Err(DispatchError::InvalidConfig(
                "retry interval must be non-zero".to_string(),
            ));
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let mut state = self.shared.lock_state();
        if matches!(*state, Lifecycle::Running(_)) {
            return Err(DispatchError::AlreadyRunning);
        }

        let (queue, receiver) = queue::bounded(capacity);
        let workers = (1..=num_workers)
            .map(|id| {
                runtime.spawn(worker::run_worker(
                    id,
                    receiver.clone(),
                    Arc::clone(&self.shared),
                ))
            })
            .collect();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let scheduler = runtime.spawn(scheduler::run_scheduler(
            Arc::clone(&self.shared),
            shutdown_rx,
        ));

        *state = Lifecycle::Running(Running {
            queue,
            workers,
            scheduler,
            shutdown,
        });

        tracing::info!(
            workers = num_workers,
            capacity,
            retry_interval_secs = self.shared.config.retry_interval.as_secs(),
            "Notification dispatcher started"
        );
        Ok(())
    }

    /// Stop accepting notifications and wait until every queued one has
    /// been attempted and its outcome persisted.
    pub async fn stop(&self) -> Result<(), DispatchError> {
        let running = {
            let mut state = self.shared.lock_state();
            match std::mem::replace(&mut *state, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                Lifecycle::Stopped => return Err(DispatchError::NotRunning),
            }
        };

        let Running {
            queue,
            workers,
            scheduler,
            shutdown,
        } = running;

        tracing::info!(
            queued = queue.len(),
            "Stopping notification dispatcher — draining queue"
        );

        // Dropping the only producer handle closes the queue.
        drop(queue);
        let _ = shutdown.send(true);

        if let Err(e) = scheduler.await {
            tracing::warn!(error = %e, "Retry scheduler task ended abnormally");
        }
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Notification worker task ended abnormally");
            }
        }

        tracing::info!("Notification dispatcher stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.shared.lock_state(), Lifecycle::Running(_))
    }

    /// Queue an already stored notification for delivery. Never blocks.
    ///
    /// Fails with [`DispatchError::NotRunning`] when stopped,
    /// [`DispatchError::QueueFull`] when the buffer is at capacity and
    /// [`DispatchError::AlreadyQueued`] when the notification is already
    /// owned by the dispatcher.
    pub fn enqueue(&self, notification: Notification) -> Result<(), DispatchError> {
        self.shared.enqueue(notification)
    }

    /// Store a new notification and queue it for delivery.
    ///
    /// Once the record is stored the call succeeds even if the notification
    /// could not be queued; the retry scheduler picks it up after the orphan
    /// grace period.
    pub async fn submit(&self, new: NewNotification) -> Result<Notification, DispatchError> {
        new.validate().map_err(DispatchError::InvalidNotification)?;

        let notification = self.shared.store.create(&new).await?;

        match self.shared.enqueue(notification.clone()) {
            Ok(()) => {
                tracing::debug!(
                    notification_id = %notification.id,
                    event_type = %notification.event_type,
                    "Notification queued"
                );
            }
            Err(
                e @ (DispatchError::QueueFull
                | DispatchError::NotRunning
                | DispatchError::AlreadyQueued(_)),
            ) => {
                tracing::warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Notification stored but not queued — left for the retry scheduler"
                );
            }
            Err(e) => return Err(e),
        }

        Ok(notification)
    }

    /// Run one retry sweep right away, as the scheduler would at `now`.
    pub async fn sweep_due_retries(&self, now: DateTime<Utc>) -> Result<SweepReport, DispatchError> {
        Ok(self.shared.sweep(now).await?)
    }

    pub fn queue_stats(&self) -> QueueStats {
        let (running, queued, capacity, workers) = match &*self.shared.lock_state() {
            Lifecycle::Running(r) => (true, r.queue.len(), r.queue.capacity(), r.workers.len()),
            Lifecycle::Stopped => (false, 0, self.shared.config.queue_capacity, 0),
        };
        let counters = &self.shared.counters;

        QueueStats {
            running,
            queued,
            capacity,
            workers,
            in_flight: self.shared.lock_in_flight().len(),
            sent: counters.sent(),
            failed: counters.failed(),
            retries_scheduled: counters.retries_scheduled(),
            persistence_errors: counters.persistence_errors(),
            stale_skipped: counters.stale_skipped(),
        }
    }
}

impl<S, M> Drop for NotificationDispatcher<S, M>
where
    S: NotificationStore,
    M: MessageSender,
{
    /// Close the queue and stop the scheduler if the dispatcher is dropped
    /// while running. Workers finish the queued notifications in the background.
    fn drop(&mut self) {
        let previous = std::mem::replace(&mut *self.shared.lock_state(), Lifecycle::Stopped);
        if let Lifecycle::Running(running) = previous {
            tracing::warn!("Notification dispatcher dropped while running — stop() was not called");
            let _ = running.shutdown.send(true);
        }
    }
}

impl<S, M> std::fmt::Debug for NotificationDispatcher<S, M>
where
    S: NotificationStore,
    M: MessageSender,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .finish()
    }
}
