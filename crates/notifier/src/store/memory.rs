use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hrdesk_common::types::{DeliveryStatus, NewNotification, Notification};

use super::NotificationStore;
use crate::error::StoreError;

/// In-process store with the same guard semantics as the Postgres one.
///
/// Used by tests and for running the API without a database. Clones share
/// the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationStore {
    records: Arc<Mutex<HashMap<Uuid, Notification>>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing `create`. Lets callers seed state
    /// such as old timestamps.
    pub fn insert(&self, notification: Notification) {
        self.records().insert(notification.id, notification);
    }

    pub fn get(&self, id: Uuid) -> Option<Notification> {
        self.records().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<Uuid, Notification>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` to a pending record at `version`, bumping the version.
    fn update_guarded(
        &self,
        id: Uuid,
        version: i64,
        retry_count: Option<i32>,
        update: impl FnOnce(&mut Notification),
    ) -> Result<(), StoreError> {
        let mut records = self.records();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound { id })?;

        let regresses = retry_count.is_some_and(|count| count < record.retry_count);
        if record.version != version || record.status != DeliveryStatus::Pending || regresses {
            return Err(StoreError::Conflict { id });
        }

        update(record);
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(())
    }
}

impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient: new.recipient.clone(),
            event_type: new.event_type.clone(),
            subject: new.subject.clone(),
            body: new.body.clone(),
            status: DeliveryStatus::Pending,
            retry_count: 0,
            max_retries: new.max_retries,
            next_retry_at: None,
            error_message: None,
            sent_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.insert(notification.clone());
        Ok(notification)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        Ok(self.get(id))
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        version: i64,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update_guarded(id, version, None, |n| {
            n.status = DeliveryStatus::Sent;
            n.sent_at = Some(sent_at);
            n.next_retry_at = None;
        })
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        version: i64,
        retry_count: i32,
        error: &str,
    ) -> Result<(), StoreError> {
        self.update_guarded(id, version, Some(retry_count), |n| {
            n.status = DeliveryStatus::Failed;
            n.retry_count = retry_count;
            n.error_message = Some(error.to_string());
            n.next_retry_at = None;
        })
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        version: i64,
        retry_count: i32,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), StoreError> {
        self.update_guarded(id, version, Some(retry_count), |n| {
            n.retry_count = retry_count;
            n.next_retry_at = Some(next_retry_at);
            n.error_message = Some(error.to_string());
        })
    }

    async fn query_due_retries(&self, now: DateTime<Utc>) -> Result<Vec<Notification>, StoreError> {
        let mut due: Vec<Notification> = self
            .records()
            .values()
            .filter(|n| {
                n.status == DeliveryStatus::Pending && n.next_retry_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|n| n.next_retry_at);
        Ok(due)
    }

    async fn query_orphaned(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut orphaned: Vec<Notification> = self
            .records()
            .values()
            .filter(|n| {
                n.status == DeliveryStatus::Pending
                    && n.next_retry_at.is_none()
                    && n.retry_count == 0
                    && n.created_at <= created_before
            })
            .cloned()
            .collect();
        orphaned.sort_by_key(|n| n.created_at);
        Ok(orphaned)
    }
}
