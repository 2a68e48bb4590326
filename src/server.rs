//! HTTP trigger: start a run and serve what it saved.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::artifacts::validate_artifact_name;
use crate::runner::RunTrigger;

#[derive(Clone)]
pub struct AppState {
    trigger: Arc<dyn RunTrigger>,
    artifact_dir: PathBuf,
}

impl AppState {
    pub fn new(trigger: Arc<dyn RunTrigger>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            trigger,
            artifact_dir: artifact_dir.into(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/run", get(run_report))
        .route("/artifacts/:name", get(artifact))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Server failed")
}

async fn health() -> &'static str {
    "reportgrab is alive"
}

async fn run_report(State(state): State<AppState>) -> (StatusCode, String) {
    info!("Run requested over HTTP");
    match state.trigger.trigger().await {
        Ok(report) if report.is_completed() => (StatusCode::OK, report.summary()),
        Ok(report) => (StatusCode::INTERNAL_SERVER_ERROR, report.summary()),
        Err(e) => {
            error!("Run failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Run failed: {}", e))
        }
    }
}

/// MIME type from the artifact's extension
pub fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "html" || ext == "htm" => "text/html; charset=utf-8",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "json" => "application/json",
        _ => "application/octet-stream",
    }
}

async fn artifact(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if validate_artifact_name(&name).is_err() {
        return (StatusCode::BAD_REQUEST, "Invalid artifact name").into_response();
    }

    match tokio::fs::read(state.artifact_dir.join(&name)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&name))], bytes).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, format!("No artifact named {}", name)).into_response()
        }
        Err(e) => {
            error!("Failed to read artifact {}: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read artifact").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("report.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("REPORT.HTM"), "text/html; charset=utf-8");
        assert_eq!(content_type("screenshot.png"), "image/png");
        assert_eq!(content_type("run.json"), "application/json");
        assert_eq!(content_type("blob"), "application/octet-stream");
    }
}
