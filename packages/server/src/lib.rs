//! Tsudoi presence server library.
//!
//! Real-time presence and event-synchronization layer for a collaborative
//! file-sharing application: tracks which users are viewing which file,
//! propagates viewer-set changes to interested clients, and relays
//! ancillary notifications over a persistent WebSocket connection.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use config::ServerConfig;

use auth::StaticTokenVerifier;
use infrastructure::repository::InMemoryPresenceRepository;
use ui::{handler, state::AppState};

/// Build the axum router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(handler::websocket_handler))
        .route("/api/health", get(handler::health_check))
        .route("/api/presence", get(handler::get_presence))
        .route("/api/online-users", get(handler::get_online_users))
        .route("/api/events/file-uploaded", post(handler::post_file_uploaded))
        .route(
            "/api/events/resource-shared",
            post(handler::post_resource_shared),
        )
        .route(
            "/api/events/permission-updated",
            post(handler::post_permission_updated),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the default application state for a config.
pub fn build_state(config: &ServerConfig) -> Arc<AppState> {
    let repository = Arc::new(InMemoryPresenceRepository::new());
    let verifier = Arc::new(StaticTokenVerifier::new(config.auth_token.clone()));
    Arc::new(AppState::new(repository, verifier))
}

/// Run the presence server until ctrl-c.
pub async fn run_server(config: ServerConfig) -> Result<(), std::io::Error> {
    let state = build_state(&config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
