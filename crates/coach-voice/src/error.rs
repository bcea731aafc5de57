//! Voice pipeline error types.

/// Errors that can occur in the voice pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    /// No audio input device found.
    #[error("No audio input device found")]
    NoInputDevice,

    /// Failed to open audio input stream.
    #[error("Failed to open audio input stream: {0}")]
    InputStreamError(String),

    /// Failed to open audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// Microphone permission denied.
    #[error("Microphone permission denied")]
    MicrophonePermissionDenied,

    /// None of the preferred recording encodings is supported by the device.
    #[error("No supported recording format (tried {0})")]
    UnsupportedEncoding(String),

    /// The recording produced no audio.
    #[error("Recording is empty")]
    EmptyRecording,

    /// Failed to transcribe audio.
    #[error("Transcription failed: {0}")]
    TranscriptionError(String),

    /// Failed to synthesize speech.
    #[error("Speech synthesis failed: {0}")]
    SynthesisError(String),

    /// Synthesized audio could not be played.
    #[error("Audio playback failed: {0}")]
    PlaybackError(String),

    /// Missing credential for a speech service.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The controller is already recording or reading.
    #[error("Voice operation already active")]
    AlreadyActive,

    /// No recording is in progress.
    #[error("No recording in progress")]
    NotActive,

    /// The operation was stopped before it completed.
    #[error("Voice operation cancelled")]
    Cancelled,

    /// The dedicated audio thread is gone.
    #[error("Audio thread terminated unexpectedly")]
    AudioThreadDied,
}

impl VoiceError {
    /// Whether the error comes from the capture device rather than a remote service.
    #[must_use]
    pub const fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::NoInputDevice
                | Self::InputStreamError(_)
                | Self::MicrophonePermissionDenied
                | Self::UnsupportedEncoding(_)
                | Self::AudioThreadDied
        )
    }
}
