//! Durable notification records.
//!
//! The store, not the dispatch queue, is the source of truth: anything not
//! yet delivered can always be found again by querying it.
//!
//! # Ownership protocol
//!
//! At any instant a notification is owned either by the store (dormant,
//! waiting for `next_retry_at`) or by the dispatcher (queued or being
//! delivered by exactly one worker). The dispatcher tracks the ids it owns
//! and refuses to queue one twice. A sweep can still queue a copy read just
//! before a worker released the id, so workers re-read the record and drop
//! any copy whose `version` or status no longer matches. Every update method
//! additionally carries the `version` the caller read and only applies while
//! the record is still `pending` at that version, returning
//! [`StoreError::Conflict`] otherwise.
//! Terminal records are therefore never modified again.

mod memory;
mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hrdesk_common::types::{NewNotification, Notification};

use crate::error::StoreError;

pub use memory::MemoryNotificationStore;
pub use postgres::PgNotificationStore;

/// Persistence operations the dispatcher depends on.
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a new `pending` notification and return it with its id.
    fn create(
        &self,
        new: &NewNotification,
    ) -> impl Future<Output = Result<Notification, StoreError>> + Send;

    fn find(&self, id: Uuid) -> impl Future<Output = Result<Option<Notification>, StoreError>> + Send;

    /// Record a successful delivery. Terminal.
    fn mark_sent(
        &self,
        id: Uuid,
        version: i64,
        sent_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record the final failed attempt. Terminal.
    fn mark_failed(
        &self,
        id: Uuid,
        version: i64,
        retry_count: i32,
        error: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record a failed attempt and when to try again. Stays `pending`.
    fn schedule_retry(
        &self,
        id: Uuid,
        version: i64,
        retry_count: i32,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All `pending` notifications whose `next_retry_at` is at or before `now`.
    fn query_due_retries(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Notification>, StoreError>> + Send;

    /// `pending` notifications that were never attempted and were created
    /// before `created_before`.
    fn query_orphaned(
        &self,
        created_before: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Notification>, StoreError>> + Send;
}
