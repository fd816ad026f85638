//! Notification routes: submission, lookup and dispatcher operations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use hrdesk_common::error::AppError;
use hrdesk_common::types::{NewNotification, Notification, Recipient};
use hrdesk_notifier::{NotificationStore, QueueStats, SweepReport};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", post(submit_notification))
        .route("/api/notifications/stats", get(queue_stats))
        .route("/api/notifications/sweep", post(sweep_now))
        .route("/api/notifications/{id}", get(get_notification))
}

/// Body of `POST /api/notifications`.
#[derive(Debug, Deserialize)]
pub struct SubmitNotificationRequest {
    pub recipient: Recipient,
    pub event_type: String,
    pub subject: String,
    pub body: String,
    /// Falls back to the dispatcher's configured default.
    pub max_retries: Option<i32>,
}

/// POST /api/notifications — Store a notification and queue it for delivery.
///
/// Responds 202 once the record is stored, even if the queue was full; the
/// retry scheduler delivers it later in that case.
async fn submit_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SubmitNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let new = NewNotification {
        recipient: req.recipient,
        event_type: req.event_type,
        subject: req.subject,
        body: req.body,
        max_retries: req
            .max_retries
            .unwrap_or(state.dispatcher.config().default_max_retries),
    };

    let notification = state.dispatcher.submit(new).await?;
    tracing::debug!(
        notification_id = %notification.id,
        submitted_by = %auth.user_id,
        "Notification submitted"
    );

    Ok((StatusCode::ACCEPTED, Json(notification)))
}

/// GET /api/notifications/stats — Queue depth, worker count and counters.
async fn queue_stats(State(state): State<AppState>, _auth: AuthUser) -> Json<QueueStats> {
    Json(state.dispatcher.queue_stats())
}

/// POST /api/notifications/sweep — Resubmit due retries without waiting for
/// the next scheduler tick.
async fn sweep_now(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SweepReport>, AppError> {
    let report = state.dispatcher.sweep_due_retries(chrono::Utc::now()).await?;
    tracing::info!(
        requested_by = %auth.user_id,
        due = report.due,
        orphaned = report.orphaned,
        enqueued = report.enqueued,
        "Manual retry sweep"
    );
    Ok(Json(report))
}

/// GET /api/notifications/:id — Current delivery state of one notification.
async fn get_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    state
        .dispatcher
        .store()
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
}
