//! Device abstractions for voice capture and speech output.
//!
//! The controllers never touch an audio API directly. They drive these
//! object-safe traits, which are implemented by the local cpal/rodio devices
//! (`local-audio` feature) and by test doubles.
//!
//! | Trait | Role |
//! |---|---|
//! | [`CaptureDevice`] | Opens a recording in a negotiated [`AudioEncoding`] |
//! | [`CaptureStream`] | One open recording; finished into encoded segments |
//! | [`AudioOutput`] | Plays one synthesized clip at a time |

use std::fmt;

use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;

use crate::backend::SynthesizedAudio;
use crate::error::VoiceError;

// ── Encodings ──────────────────────────────────────────────────────

/// Container format of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    Webm,
    Mp4,
    Ogg,
    Wav,
}

impl AudioEncoding {
    /// Probe order used when opening a recording.
    pub const PREFERRED: [Self; 4] = [Self::Webm, Self::Mp4, Self::Ogg, Self::Wav];

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Webm => "audio/webm",
            Self::Mp4 => "audio/mp4",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
        }
    }

    #[must_use]
    pub const fn file_extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
        }
    }

    /// Parse a `Content-Type` value. Parameters such as `;codecs=opus` are ignored.
    #[must_use]
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/webm" | "video/webm" => Some(Self::Webm),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "video/mp4" => Some(Self::Mp4),
            "audio/ogg" | "application/ogg" => Some(Self::Ogg),
            "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Some(Self::Wav),
            _ => None,
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Pick the first entry of [`AudioEncoding::PREFERRED`] that the device supports.
pub fn negotiate_encoding(supported: &[AudioEncoding]) -> Result<AudioEncoding, VoiceError> {
    AudioEncoding::PREFERRED
        .into_iter()
        .find(|e| supported.contains(e))
        .ok_or_else(|| {
            let tried: Vec<&str> = AudioEncoding::PREFERRED
                .iter()
                .map(|e| e.mime_type())
                .collect();
            VoiceError::UnsupportedEncoding(tried.join(", "))
        })
}

/// A finished recording, ready for transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Bytes,
    pub encoding: AudioEncoding,
}

impl AudioPayload {
    pub fn new(bytes: impl Into<Bytes>, encoding: AudioEncoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    /// Join buffered segments into one payload.
    #[must_use]
    pub fn from_segments(segments: Vec<Bytes>, encoding: AudioEncoding) -> Self {
        let mut buf = BytesMut::with_capacity(segments.iter().map(Bytes::len).sum());
        for segment in segments {
            buf.extend_from_slice(&segment);
        }
        Self::new(buf.freeze(), encoding)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

// ── Capture ────────────────────────────────────────────────────────

/// A microphone that can open recordings.
pub trait CaptureDevice: Send + Sync {
    /// Encodings this device can record in.
    fn supported_encodings(&self) -> Vec<AudioEncoding>;

    /// Open the device and start recording.
    ///
    /// Permission problems are reported as
    /// [`VoiceError::MicrophonePermissionDenied`], a missing device as
    /// [`VoiceError::NoInputDevice`].
    fn open(&self, encoding: AudioEncoding) -> Result<Box<dyn CaptureStream>, VoiceError>;
}

/// One open recording. Dropping it without finishing discards the audio.
pub trait CaptureStream: Send {
    /// Stop recording and return the encoded segments captured so far.
    fn finish(self: Box<Self>) -> Result<Vec<Bytes>, VoiceError>;

    /// Stop recording and discard everything.
    fn abort(self: Box<Self>);
}

// ── Output ─────────────────────────────────────────────────────────

/// Speaker output. Plays one clip at a time.
pub trait AudioOutput: Send + Sync {
    /// Start playing `audio`. The handle resolves when the clip ends naturally.
    fn play(&self, audio: SynthesizedAudio) -> Result<PlaybackHandle, VoiceError>;

    /// Halt whatever is playing immediately. Outstanding handles resolve as cancelled.
    fn stop(&self);
}

/// Completion side of a [`PlaybackHandle`], kept by the output implementation.
#[derive(Debug)]
pub struct PlaybackCompletion {
    tx: oneshot::Sender<Result<(), VoiceError>>,
}

impl PlaybackCompletion {
    /// Report that the clip ended naturally, or failed.
    pub fn complete(self, result: Result<(), VoiceError>) {
        let _ = self.tx.send(result);
    }
}

/// Awaitable end of one playing clip.
#[derive(Debug)]
pub struct PlaybackHandle {
    done: oneshot::Receiver<Result<(), VoiceError>>,
}

impl PlaybackHandle {
    /// Create a connected completion/handle pair.
    #[must_use]
    pub fn channel() -> (PlaybackCompletion, Self) {
        let (tx, done) = oneshot::channel();
        (PlaybackCompletion { tx }, Self { done })
    }

    /// Wait for the clip to end. A dropped completion counts as cancelled.
    pub async fn finished(self) -> Result<(), VoiceError> {
        self.done.await.unwrap_or(Err(VoiceError::Cancelled))
    }
}
