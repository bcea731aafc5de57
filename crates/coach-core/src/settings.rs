//! Client settings domain types and validation.
//!
//! These drive the interactive session: where the server lives, how replies
//! are chunked for speech, and the bootstrap/auto-read timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default port for the coach HTTP server.
pub const DEFAULT_SERVER_PORT: u16 = 8787;

/// Default target length of a speech chunk, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Default delay before the opening message is inserted.
pub const DEFAULT_OPENING_DELAY_MS: u64 = 3000;

/// Shortest accepted opening delay. Matches the mode entrance transition.
pub const MIN_OPENING_DELAY_MS: u64 = 1000;

/// Default settle delay between a reply finishing and auto-read starting.
pub const DEFAULT_AUTO_READ_DELAY_MS: u64 = 500;

/// Default ElevenLabs voice.
pub const DEFAULT_VOICE_ID: &str = "Z5A0ZMhOWwL3m0q2Yo1P";

/// Default ElevenLabs model.
pub const DEFAULT_TTS_MODEL_ID: &str = "eleven_monolingual_v1";

/// Interactive client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the coach server (`http://host:port`).
    pub server_url: String,

    /// Target chunk length for speech synthesis.
    pub chunk_size: usize,

    /// Delay before the opening message, in milliseconds.
    pub opening_delay_ms: u64,

    /// Settle delay before auto-read arms playback, in milliseconds.
    pub auto_read_delay_ms: u64,

    /// Initial value of the auto-read toggle.
    pub auto_read: bool,

    /// Voice used for speech synthesis.
    pub voice_id: String,

    /// Synthesis model.
    pub tts_model_id: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{DEFAULT_SERVER_PORT}"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            opening_delay_ms: DEFAULT_OPENING_DELAY_MS,
            auto_read_delay_ms: DEFAULT_AUTO_READ_DELAY_MS,
            auto_read: false,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            tts_model_id: DEFAULT_TTS_MODEL_ID.to_string(),
        }
    }
}

impl ClientSettings {
    #[must_use]
    pub const fn opening_delay(&self) -> Duration {
        Duration::from_millis(self.opening_delay_ms)
    }

    #[must_use]
    pub const fn auto_read_delay(&self) -> Duration {
        Duration::from_millis(self.auto_read_delay_ms)
    }

    /// Server URL without a trailing slash.
    #[must_use]
    pub fn server_base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Chunk size must be between 20 and 5000 characters, got {0}")]
    InvalidChunkSize(usize),

    #[error("Opening delay must be at least {MIN_OPENING_DELAY_MS} ms, got {0}")]
    OpeningDelayTooShort(u64),

    #[error("Auto-read delay must be at most 10000 ms, got {0}")]
    AutoReadDelayTooLong(u64),

    #[error("Server URL must start with http:// or https://, got '{0}'")]
    InvalidServerUrl(String),

    #[error("Voice id cannot be empty")]
    EmptyVoiceId,
}

/// Validate settings values.
pub fn validate_settings(settings: &ClientSettings) -> Result<(), SettingsError> {
    if !(20..=5000).contains(&settings.chunk_size) {
        return Err(SettingsError::InvalidChunkSize(settings.chunk_size));
    }

    if settings.opening_delay_ms < MIN_OPENING_DELAY_MS {
        return Err(SettingsError::OpeningDelayTooShort(settings.opening_delay_ms));
    }

    if settings.auto_read_delay_ms > 10_000 {
        return Err(SettingsError::AutoReadDelayTooLong(settings.auto_read_delay_ms));
    }

    let url = settings.server_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(SettingsError::InvalidServerUrl(settings.server_url.clone()));
    }

    if settings.voice_id.trim().is_empty() {
        return Err(SettingsError::EmptyVoiceId);
    }

    Ok(())
}
