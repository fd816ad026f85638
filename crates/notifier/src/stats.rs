//! Dispatcher counters and the operator-facing stats snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time view of the dispatcher for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub running: bool,
    /// Notifications waiting for a worker.
    pub queued: usize,
    pub capacity: usize,
    pub workers: usize,
    /// Notifications queued or currently being delivered.
    pub in_flight: usize,
    pub sent: u64,
    pub failed: u64,
    pub retries_scheduled: u64,
    pub persistence_errors: u64,
    /// Queued copies dropped because the stored record had moved on.
    pub stale_skipped: u64,
}

/// Outcome counters accumulated since the dispatcher was created.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    retries_scheduled: AtomicU64,
    persistence_errors: AtomicU64,
    stale_skipped: AtomicU64,
}

impl Counters {
    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_scheduled(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persistence_error(&self) {
        self.persistence_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_skipped(&self) {
        self.stale_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn retries_scheduled(&self) -> u64 {
        self.retries_scheduled.load(Ordering::Relaxed)
    }

    pub(crate) fn persistence_errors(&self) -> u64 {
        self.persistence_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn stale_skipped(&self) -> u64 {
        self.stale_skipped.load(Ordering::Relaxed)
    }
}
