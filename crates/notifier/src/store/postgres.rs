use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hrdesk_common::types::{DeliveryStatus, NewNotification, Notification};

use super::NotificationStore;
use crate::error::StoreError;

/// PostgreSQL-backed notification store.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Turn "no row matched the guard" into the right error.
async fn guard_miss(pool: &PgPool, id: Uuid) -> StoreError {
    match sqlx::query_as::<_, (Uuid,)>("SELECT id FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(_)) => StoreError::Conflict { id },
        Ok(None) => StoreError::NotFound { id },
        Err(e) => StoreError::Database(e),
    }
}

impl NotificationStore for PgNotificationStore {
    async fn create(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications
                (id, recipient_email, recipient_name, event_type, subject, body, status, retry_count, max_retries, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.recipient.email)
        .bind(&new.recipient.name)
        .bind(&new.event_type)
        .bind(&new.subject)
        .bind(&new.body)
        .bind(DeliveryStatus::Pending.to_string())
        .bind(new.max_retries)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        let notification = sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(notification)
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        version: i64,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $3, sent_at = $4, next_retry_at = NULL,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(version)
        .bind(DeliveryStatus::Sent.to_string())
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(guard_miss(&self.pool, id).await);
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        version: i64,
        retry_count: i32,
        error: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $3, retry_count = $4, error_message = $5, next_retry_at = NULL,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'pending' AND retry_count <= $4
            "#,
        )
        .bind(id)
        .bind(version)
        .bind(DeliveryStatus::Failed.to_string())
        .bind(retry_count)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(guard_miss(&self.pool, id).await);
        }
        Ok(())
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        version: i64,
        retry_count: i32,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET retry_count = $3, next_retry_at = $4, error_message = $5,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'pending' AND retry_count <= $3
            "#,
        )
        .bind(id)
        .bind(version)
        .bind(retry_count)
        .bind(next_retry_at)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(guard_miss(&self.pool, id).await);
        }
        Ok(())
    }

    async fn query_due_retries(&self, now: DateTime<Utc>) -> Result<Vec<Notification>, StoreError> {
        let due = sqlx::query_as(
            r#"
            SELECT * FROM notifications
            WHERE status = 'pending' AND next_retry_at IS NOT NULL AND next_retry_at <= $1
            ORDER BY next_retry_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(due)
    }

    async fn query_orphaned(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError> {
        let orphaned = sqlx::query_as(
            r#"
            SELECT * FROM notifications
            WHERE status = 'pending' AND next_retry_at IS NULL AND retry_count = 0
              AND created_at <= $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(created_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(orphaned)
    }
}
