//! Chat relay (`POST /api/chat`).
//!
//! Forwards the conversation upstream and re-encodes the reply as NDJSON
//! [`StreamFrame`] lines. Failures before the first delta are plain JSON
//! errors with a non-2xx status; failures after it arrive as an `error`
//! frame, since the status line has already been sent.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use coach_core::{
    CompletionRequest, GENERIC_SYSTEM_MESSAGE, LearningMode, StreamFrame, TokenStream, WireMessage,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::HttpError;
use crate::state::AppState;

/// Request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRelayRequest {
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub system_message: Option<String>,
}

/// Pick the instruction: the caller's, else the mode default, else the generic one.
pub fn resolve_instruction(mode: Option<LearningMode>, supplied: Option<&str>) -> String {
    if let Some(text) = supplied.filter(|s| !s.trim().is_empty()) {
        return text.to_string();
    }
    mode.map_or(GENERIC_SYSTEM_MESSAGE, LearningMode::default_system_message)
        .to_string()
}

pub async fn relay(
    State(state): State<AppState>,
    payload: Result<Json<ChatRelayRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    let Json(body) = payload.map_err(|e| HttpError::BadRequest(e.body_text()))?;

    let mode = body.mode.as_deref().and_then(LearningMode::parse);
    if mode.is_none() {
        tracing::debug!(requested = ?body.mode, "Unknown mode, using the generic instruction");
    }
    let system_message = resolve_instruction(mode, body.system_message.as_deref());

    tracing::info!(
        mode = ?mode,
        messages = body.messages.len(),
        custom_instruction = body.system_message.as_deref().is_some_and(|s| !s.trim().is_empty()),
        "Chat relay request"
    );

    let tokens = state
        .completion
        .stream_completion(CompletionRequest {
            mode,
            messages: body.messages,
            system_message,
        })
        .await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frame_stream(tokens)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

fn encode(frame: &StreamFrame) -> Result<Bytes, std::io::Error> {
    let mut line = serde_json::to_vec(frame).map_err(std::io::Error::other)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Encode deltas as frames, ending with exactly one `done` or `error` frame.
fn frame_stream(tokens: TokenStream) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    futures_util::stream::unfold(Some(tokens), |state| async move {
        let mut tokens = state?;
        let last = match tokens.next().await {
            Some(Ok(content)) => {
                return Some((encode(&StreamFrame::Delta { content }), Some(tokens)));
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Upstream stream failed mid-response");
                StreamFrame::Error {
                    message: e.to_string(),
                }
            }
            None => StreamFrame::Done,
        };
        Some((encode(&last), None))
    })
}
