//! OpenAI upstream adapter.
//!
//! [`OpenAiClient`] implements both ports the relay routes need:
//!
//! | Port | Endpoint |
//! |---|---|
//! | [`CompletionPort`] | `POST {base}/chat/completions` with `stream: true` |
//! | [`Transcriber`] | `POST {base}/audio/transcriptions` (multipart upload) |
//!
//! The credential is optional at construction. A client without one starts
//! fine and answers every call with a missing-credential error, so the
//! server stays up and the rest of the API keeps working.

mod sse;

use async_trait::async_trait;
use coach_core::{CompletionError, CompletionPort, CompletionRequest, TokenStream};
use coach_voice::{AudioPayload, Transcriber, VoiceError};
use serde::{Deserialize, Serialize};

pub use sse::delta_stream;

/// Default OpenAI API base.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default transcription model.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Message returned when no credential is configured.
pub const MISSING_KEY_MESSAGE: &str =
    "OpenAI API key is missing. Please add OPENAI_API_KEY to your environment variables.";

/// Upstream connection settings.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("transcription_model", &self.transcription_model)
            .finish()
    }
}

impl OpenAiConfig {
    /// Set the credential. Blank keys count as absent.
    #[must_use]
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether a credential is configured.
    pub const fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI client for chat streaming and transcription.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<UpstreamMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct UpstreamMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionBody {
    text: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub const fn with_client(client: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }

    pub const fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }
}

/// Extract an error message from an OpenAI error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CompletionPort for OpenAiClient {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream, CompletionError> {
        let Some(key) = self.config.api_key.as_deref() else {
            return Err(CompletionError::MissingCredential(MISSING_KEY_MESSAGE.to_string()));
        };

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(UpstreamMessage {
            role: "system",
            content: &request.system_message,
        });
        messages.extend(request.messages.iter().map(|m| UpstreamMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        tracing::debug!(
            model = %self.config.chat_model,
            mode = ?request.mode,
            messages = messages.len(),
            "Opening upstream completion"
        );

        let body = ChatBody {
            model: &self.config.chat_model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Network(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        Ok(delta_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String, VoiceError> {
        let Some(key) = self.config.api_key.as_deref() else {
            return Err(VoiceError::MissingCredential(MISSING_KEY_MESSAGE.to_string()));
        };
        if payload.is_empty() {
            return Err(VoiceError::EmptyRecording);
        }

        let encoding = payload.encoding;
        let file = reqwest::multipart::Part::stream(payload.bytes)
            .file_name(format!("recording.{}", encoding.file_extension()))
            .mime_str(encoding.mime_type())
            .map_err(|e| VoiceError::TranscriptionError(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", file);

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::TranscriptionError(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VoiceError::TranscriptionError(format!(
                "OpenAI HTTP {}: {}",
                status.as_u16(),
                extract_error_message(&text)
            )));
        }

        let body: TranscriptionBody = response
            .json()
            .await
            .map_err(|e| VoiceError::TranscriptionError(format!("Unreadable transcript: {e}")))?;
        Ok(body.text.trim().to_string())
    }
}
