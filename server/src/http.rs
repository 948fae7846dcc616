//! HTTP surface: router, handlers, and error translation.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics::{counter, histogram};
use tempfile::NamedTempFile;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use shared::{config, ErrorResponse, HealthResponse};

use crate::audio;
use crate::tts::{CloneRequest, TtsEngine, Waveform};

/// Largest accepted request body. Reference clips are short WAV files; this
/// bound exists to reject runaway uploads, not to enforce a clip length.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Application state shared across handlers. Built once at startup; the
/// engine is read-only from then on.
pub struct AppState {
    pub engine: Arc<dyn TtsEngine>,
    /// Checkpoint identifier reported by `/health`.
    pub model: Option<String>,
}

/// Error carrying the HTTP status it should be reported with.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/synthesize", post(synthesize_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /synthesize - Clone a voice from a reference clip.
async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let start = Instant::now();
    counter!("tts_requests_total").increment(1);

    match synthesize(state, multipart).await {
        Ok((wav, audio_secs)) => {
            let duration = start.elapsed();
            let rtf = duration.as_secs_f32() / audio_secs;

            histogram!("tts_synthesis_duration_seconds").record(duration.as_secs_f64());
            histogram!("tts_rtf").record(rtf as f64);
            counter!("tts_requests_success").increment(1);

            info!(
                duration_ms = duration.as_millis(),
                audio_secs = audio_secs,
                rtf = rtf,
                "Synthesis complete"
            );

            let mut response = (StatusCode::OK, wav).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("audio/wav"),
            );
            response.headers_mut().insert(
                header::CONTENT_DISPOSITION,
                header::HeaderValue::from_static("attachment; filename=\"generated_audio.wav\""),
            );
            if let Ok(duration_header) = header::HeaderValue::try_from(audio_secs.to_string()) {
                response.headers_mut().insert(
                    header::HeaderName::from_static("x-audio-duration"),
                    duration_header,
                );
            }
            response
        }
        Err(e) => {
            counter!("tts_requests_error").increment(1);
            error!(status = %e.status(), error = %e.message(), "Synthesis failed");
            e.into_response()
        }
    }
}

/// Request pipeline: validate, stage, infer, persist, respond. Both temp
/// files live inside the blocking task's scope and are unlinked on drop
/// whether synthesis succeeds or fails.
async fn synthesize(
    state: Arc<AppState>,
    mut multipart: Multipart,
) -> Result<(Vec<u8>, f32), ApiError> {
    let mut reference_audio: Option<Vec<u8>> = None;
    let mut text: Option<String> = None;
    let mut reference_text = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "reference_audio" => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("reference_audio read error: {}", e))
                })?;
                reference_audio = Some(bytes.to_vec());
            }
            "text" => {
                text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("text read error: {}", e)))?,
                );
            }
            "reference_text" => {
                reference_text = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("reference_text read error: {}", e))
                })?;
            }
            _ => {}
        }
    }

    let (Some(reference_audio), Some(text)) = (reference_audio, text) else {
        return Err(ApiError::bad_request(config::MISSING_FIELDS_ERROR));
    };

    info!(
        text_len = text.len(),
        ref_bytes = reference_audio.len(),
        has_ref_text = !reference_text.is_empty(),
        "Synthesizing speech"
    );

    let engine = state.engine.clone();

    // The Python pipeline is blocking and CPU/GPU-bound.
    tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, f32), ApiError> {
        let ref_wav = stage_reference(&reference_audio)?;

        let waveform = engine
            .synthesize(CloneRequest {
                ref_audio: ref_wav.path(),
                ref_text: &reference_text,
                text: &text,
            })
            .map_err(|e| ApiError::internal(e.to_string()))?;

        let gen_wav = persist_output(&waveform)?;
        let wav = std::fs::read(gen_wav.path())
            .map_err(|e| ApiError::internal(format!("failed to read generated wav: {}", e)))?;

        Ok((wav, waveform.duration_secs()))
    })
    .await
    .map_err(|e| ApiError::internal(format!("task join error: {}", e)))?
}

/// Stage uploaded reference bytes to a fresh `.wav` temp file. The
/// returned guard unlinks the file on drop.
pub fn stage_reference(bytes: &[u8]) -> Result<NamedTempFile, ApiError> {
    let ref_wav = tempfile::Builder::new()
        .suffix(".wav")
        .tempfile()
        .map_err(|e| ApiError::internal(format!("failed to create temp ref wav: {}", e)))?;
    std::fs::write(ref_wav.path(), bytes)
        .map_err(|e| ApiError::internal(format!("failed to write ref wav: {}", e)))?;
    Ok(ref_wav)
}

/// Persist a synthesized waveform to a fresh `.wav` temp file, also
/// unlinked when the guard drops.
pub fn persist_output(waveform: &Waveform) -> Result<NamedTempFile, ApiError> {
    let gen_wav = tempfile::Builder::new()
        .suffix(".wav")
        .tempfile()
        .map_err(|e| ApiError::internal(format!("failed to create temp output wav: {}", e)))?;
    audio::write_wav(gen_wav.path(), waveform)
        .map_err(|e| ApiError::internal(format!("failed to encode wav: {}", e)))?;
    Ok(gen_wav)
}

/// GET /health - Health check endpoint.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: config::VERSION.to_string(),
        model: state.model.clone(),
    })
}
