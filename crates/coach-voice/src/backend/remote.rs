//! Transcription through the coach server.

use async_trait::async_trait;
use serde::Deserialize;

use super::Transcriber;
use crate::audio_io::AudioPayload;
use crate::error::VoiceError;

/// Response body of `POST /api/stt`.
#[derive(Debug, Deserialize)]
struct SttResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`Transcriber`] that uploads recordings to `{server}/api/stt`.
///
/// The body is the raw recording; `Content-Type` carries its encoding.
pub struct RemoteTranscriber {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteTranscriber {
    pub fn new(server_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), server_url)
    }

    pub fn with_client(client: reqwest::Client, server_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/stt", server_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String, VoiceError> {
        if payload.is_empty() {
            return Err(VoiceError::EmptyRecording);
        }

        tracing::debug!(
            bytes = payload.len(),
            encoding = %payload.encoding,
            "Uploading recording for transcription"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, payload.encoding.mime_type())
            .body(payload.bytes)
            .send()
            .await
            .map_err(|e| VoiceError::TranscriptionError(e.to_string()))?;

        let status = response.status();
        let body: SttResponse = response.json().await.map_err(|e| {
            VoiceError::TranscriptionError(format!("HTTP {status}: unreadable response ({e})"))
        })?;

        if !status.is_success() {
            let message = body.error.unwrap_or_else(|| format!("HTTP {status}"));
            return Err(VoiceError::TranscriptionError(message));
        }

        body.text
            .map(|t| t.trim().to_string())
            .ok_or_else(|| VoiceError::TranscriptionError("response has no text".to_string()))
    }
}
