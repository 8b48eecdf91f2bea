//! HTTP snapshot server: the renderer-facing boundary.
//!
//! Dashboards and CLIs pull immutable poll views on demand; nothing
//! here can stall ingestion. This is the only surface with access to
//! the registry, and only through its snapshot API.

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use tokio::sync::broadcast;

use lib_poll::{PollRegistry, RegistryError};

use crate::poll_logic::config::Settings;

pub async fn run(
    settings: Settings,
    registry: PollRegistry,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/polls", get(list_polls))
        .route("/polls/{idx}", get(get_poll))
        .with_state(registry);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    log::info!("Snapshot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Snapshot server shutting down.");
        })
        .await?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn list_polls(State(registry): State<PollRegistry>) -> impl IntoResponse {
    Json(registry.summaries())
}

async fn get_poll(
    Path(idx): Path<usize>,
    State(registry): State<PollRegistry>,
) -> Response {
    match registry.snapshot(idx) {
        Ok(view) => Json(view).into_response(),
        Err(RegistryError::NotFound(idx)) => {
            (StatusCode::NOT_FOUND, format!("no poll at index {}", idx)).into_response()
        }
    }
}
