//! HRDesk notification API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use hrdesk_common::config::AppConfig;
use hrdesk_common::db::{create_pool, run_migrations};
use hrdesk_notifier::{
    ConfiguredSender, DispatcherConfig, NotificationDispatcher, PgNotificationStore,
};

use hrdesk_api::routes::create_router;
use hrdesk_api::state::AppState;

/// Notification bodies are plain text emails; anything larger is rejected.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; LOG_FORMAT=json for machine-readable output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("hrdesk_api=debug,hrdesk_notifier=debug,tower_http=debug")
    });
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting HRDesk notification API server...");

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");
    run_migrations(&pool).await?;

    let sender = ConfiguredSender::from_config(&config)?;
    let dispatcher = Arc::new(NotificationDispatcher::new(
        PgNotificationStore::new(pool),
        sender,
        DispatcherConfig::from_app_config(&config),
    ));
    dispatcher.start(config.notifier_workers)?;

    let state = AppState::new(Arc::clone(&dispatcher), config.clone());

    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Everything already queued is delivered before the process exits.
    dispatcher.stop().await?;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
