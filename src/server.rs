//! HTTP surface: health check and `POST /extract-binary`.
//!
//! The handler reads the whole body as bytes, runs extraction then
//! structuring, and answers with the structured result as a JSON *string*
//! value. Every failure becomes a 500 with `{"error": "<message>"}`.

use crate::config::ServiceConfig;
use crate::error::Ocr2JsonError;
use crate::extract::TextExtractor;
use crate::structure::Structurer;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<TextExtractor>,
    pub structurer: Arc<Structurer>,
}

impl AppState {
    pub fn new(extractor: Arc<TextExtractor>, structurer: Arc<Structurer>) -> Self {
        Self {
            extractor,
            structurer,
        }
    }

    /// Production state: engine and provider are resolved on first request.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            Arc::new(TextExtractor::new(config.clone())),
            Arc::new(Structurer::from_config(config)),
        )
    }
}

/// Build the service router.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/extract-binary", post(extract_binary))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Extract then structure one document.
pub async fn run_pipeline(state: &AppState, document: &[u8]) -> Result<String, Ocr2JsonError> {
    let transcript = state.extractor.extract(document).await?;
    let structured = state.structurer.structure(transcript.as_str()).await?;
    Ok(structured)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "API is alive" }))
}

#[instrument(skip_all, fields(bytes = body.len()))]
async fn extract_binary(State(state): State<AppState>, body: Bytes) -> Response {
    let start = Instant::now();
    match run_pipeline(&state, &body).await {
        Ok(result) => {
            info!("Request served in {}ms", start.elapsed().as_millis());
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            warn!("Request failed after {}ms: {}", start.elapsed().as_millis(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config);
    let app = router(state, config.max_body_bytes);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
