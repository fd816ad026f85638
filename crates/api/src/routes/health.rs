//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Unhealthy while the dispatcher is stopped, e.g. during shutdown.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let running = state.dispatcher.is_running();
    let status = if running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if running { "ok" } else { "stopped" },
            "service": "hrdesk-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dispatcher_running": running
        })),
    )
}
