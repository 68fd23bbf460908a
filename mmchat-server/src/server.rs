use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    connect_handler, cycle_handler, disconnect_handler, list_sessions_handler,
};
use crate::state::AppState;

/// All API routes over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/connections", post(connect_handler))
        .route("/api/connections/:id/cycle", post(cycle_handler))
        .route("/api/connections/:id", delete(disconnect_handler))
        .route("/api/sessions", get(list_sessions_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}
