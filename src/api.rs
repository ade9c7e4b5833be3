use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::Snapshot;
use crate::store::load_snapshot;

/// Serves the last persisted snapshot, read fresh on every request.
pub async fn get_status(
    State(status_path): State<Arc<PathBuf>>,
) -> Result<Json<Snapshot>, (StatusCode, Json<serde_json::Value>)> {
    load_snapshot(&status_path).await.map(Json).map_err(|e| {
        warn!(error = %e, "status endpoint could not read snapshot");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
    })
}

pub fn create_router(status_path: PathBuf) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .with_state(Arc::new(status_path))
}

pub async fn start_server(port: u16, status_path: PathBuf) -> Result<()> {
    let app = create_router(status_path);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {}", port))?;
    info!("Status endpoint: http://localhost:{}/api/status", port);
    axum::serve(listener, app).await.context("Status endpoint stopped")
}
