//! Shared application state for the Axum API server.

use std::sync::Arc;

use hrdesk_common::config::AppConfig;
use hrdesk_notifier::{ConfiguredSender, NotificationDispatcher, PgNotificationStore};

/// The dispatcher as wired in production.
pub type Dispatcher = NotificationDispatcher<PgNotificationStore, ConfiguredSender>;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, config: AppConfig) -> Self {
        Self { dispatcher, config }
    }
}
