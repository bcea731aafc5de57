//! Transcription relay (`POST /api/stt`).
//!
//! The body is the raw recording and `Content-Type` names its container.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use bytes::Bytes;
use coach_voice::{AudioEncoding, AudioPayload};
use serde::Serialize;

use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub text: String,
}

pub async fn transcribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscriptResponse>, HttpError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let encoding = AudioEncoding::from_mime(content_type).ok_or_else(|| {
        HttpError::UnsupportedMediaType(format!("Unsupported audio type: {content_type:?}"))
    })?;

    if body.is_empty() {
        return Err(HttpError::BadRequest("Recording is empty".to_string()));
    }

    tracing::debug!(bytes = body.len(), %encoding, "Relaying recording for transcription");
    let text = state
        .transcriber
        .transcribe(AudioPayload::new(body, encoding))
        .await?;
    Ok(Json(TranscriptResponse { text }))
}
