//! Speech service ports and their HTTP adapters.
//!
//! The controllers operate on trait objects (`Arc<dyn Synthesizer>`,
//! `Arc<dyn Transcriber>`) so that services can be swapped without touching
//! the state machines.
//!
//! | Module | Implements |
//! |---|---|
//! | [`elevenlabs`] | [`Synthesizer`] over the ElevenLabs streaming endpoint |
//! | [`remote`] | [`Transcriber`] over the coach server's `/api/stt` route |

pub mod elevenlabs;
pub mod remote;

use async_trait::async_trait;
use bytes::Bytes;

use crate::audio_io::AudioPayload;
use crate::error::VoiceError;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsSynthesizer};
pub use remote::RemoteTranscriber;

/// Encoded audio produced by a synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Bytes,
    /// MIME type of `bytes` (e.g. `audio/mpeg`).
    pub content_type: String,
}

/// Text-to-speech service.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize one chunk of text. The caller handles chunking.
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, VoiceError>;
}

/// Speech-to-text service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a finished recording.
    async fn transcribe(&self, payload: AudioPayload) -> Result<String, VoiceError>;
}
