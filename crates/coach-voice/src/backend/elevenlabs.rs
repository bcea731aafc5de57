//! ElevenLabs text-to-speech over HTTP.

use async_trait::async_trait;
use serde::Serialize;

use coach_core::settings::{DEFAULT_TTS_MODEL_ID, DEFAULT_VOICE_ID};

use super::{SynthesizedAudio, Synthesizer};
use crate::error::VoiceError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Environment variable overriding the voice.
pub const VOICE_ID_ENV: &str = "ELEVENLABS_VOICE_ID";

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Connection and voice parameters for [`ElevenLabsSynthesizer`].
#[derive(Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub base_url: String,
}

impl std::fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_key", &"<redacted>")
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ElevenLabsConfig {
    /// Default voice and model with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_TTS_MODEL_ID.to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read `ELEVENLABS_API_KEY` (required) and `ELEVENLABS_VOICE_ID` (optional).
    pub fn from_env() -> Result<Self, VoiceError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VoiceError::MissingCredential(format!("{API_KEY_ENV} is not set")))?;

        let mut config = Self::new(api_key);
        if let Some(voice) = std::env::var(VOICE_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            config.voice_id = voice;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream",
            self.base_url.trim_end_matches('/'),
            self.voice_id
        )
    }
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// [`Synthesizer`] backed by the ElevenLabs streaming endpoint.
///
/// The response body is buffered whole; chunks are short.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, VoiceError> {
        let body = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        tracing::debug!(
            voice = %self.config.voice_id,
            chars = text.chars().count(),
            "Requesting speech synthesis"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header("xi-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::SynthesisError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Speech synthesis rejected");
            return Err(VoiceError::SynthesisError(format!(
                "HTTP {status}: {}",
                detail.trim()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::SynthesisError(e.to_string()))?;

        if bytes.is_empty() {
            return Err(VoiceError::SynthesisError(
                "service returned no audio".to_string(),
            ));
        }

        Ok(SynthesizedAudio {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_voice_and_trims_slash() {
        let config = ElevenLabsConfig::new("k")
            .with_voice("v123")
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            config.endpoint(),
            "http://localhost:9000/v1/text-to-speech/v123/stream"
        );
    }

    #[test]
    fn debug_hides_key() {
        let config = ElevenLabsConfig::new("secret-key");
        assert!(!format!("{config:?}").contains("secret-key"));
    }

    #[test]
    fn defaults_match_service_parameters() {
        let config = ElevenLabsConfig::new("k");
        assert_eq!(config.model_id, "eleven_monolingual_v1");
        assert!((config.stability - 0.5).abs() < f32::EPSILON);
        assert!((config.similarity_boost - 0.5).abs() < f32::EPSILON);
    }
}
