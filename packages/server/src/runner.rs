//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::DEFAULT_PASSWORD;
use crate::handler::{
    auth_handler, fetch_handler, health_handler, method_not_allowed, send_handler,
};
use crate::signal::shutdown_signal;
use crate::state::AppState;

/// Build the relay API router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth", post(auth_handler).fallback(method_not_allowed))
        .route("/api/send", post(send_handler).fallback(method_not_allowed))
        .route("/api/fetch", get(fetch_handler).fallback(method_not_allowed))
        .route(
            "/api/health",
            get(health_handler).fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server until a shutdown signal arrives.
///
/// # Arguments
///
/// * `host` - The host address to bind to (e.g., "127.0.0.1")
/// * `port` - The port number to bind to
/// * `state` - Shared application state
pub async fn run_server(
    host: String,
    port: u16,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    if state.config.password == DEFAULT_PASSWORD {
        tracing::warn!("Using the default password! Pass --password to change it.");
    }

    let app = build_router(state);

    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Relay API listening on {}", listener.local_addr()?);
    tracing::info!("Endpoints registered: /api/auth, /api/send, /api/fetch, /api/health");
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
