//! HTTP API: `GET /health` and `POST /transcribe`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use voice_transcribe_common::api::{HealthResponse, TranscribeRequest, TranscribeResponse};

use crate::engine::Engine;
use crate::error::ApiError;
use crate::payload::{TempAudioFile, decode_audio};
use crate::transcribe::TranscribeOptions;

/// State shared by all handlers.
pub struct AppState {
    pub engine: Engine,
    /// Model name as configured, reported by `/health`.
    pub model: String,
    /// Device as configured, reported by `/health`.
    pub device: String,
    /// Where per-request audio files go. System temp dir if `None`.
    pub temp_dir: Option<PathBuf>,
}

/// Build the router with all routes and middleware.
pub fn router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/transcribe", post(transcribe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, method and header, with credentials.
///
/// A wildcard cannot be combined with credentials, so the request's own
/// values are echoed back instead.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Serve `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Graceful shutdown initiated");
        })
        .await
        .context("Server error")
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(&state.model, &state.device))
}

async fn transcribe(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let Json(request) = payload?;

    let bytes = decode_audio(&request.audio_base64)?;
    let options = TranscribeOptions {
        language: request.language_hint().map(str::to_string),
        task: request.task_or_default().to_string(),
    };
    debug!(
        bytes = bytes.len(),
        language = ?options.language,
        task = %options.task,
        "Transcription requested"
    );

    let engine = state.engine.clone();
    let temp_dir = state.temp_dir.clone();
    let result = tokio::task::spawn_blocking(move || {
        // Dropped at the end of this closure, on success, error or panic
        let file = TempAudioFile::write(&bytes, temp_dir.as_deref())?;
        engine.transcribe_file(file.path(), &options)
    })
    .await
    .context("Transcription task panicked")??;

    Ok(Json(TranscribeResponse {
        text: result.text,
        language: result.language,
        duration: result.duration,
    }))
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
