#![doc = include_str!("../README.md")]

pub mod audio_io;
pub mod backend;
pub mod capture;
pub mod chunker;
pub mod error;
#[cfg(feature = "local-audio")]
pub mod local;
pub mod playback;
pub mod resource;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export key types for convenience
pub use audio_io::{
    AudioEncoding, AudioOutput, AudioPayload, CaptureDevice, CaptureStream, PlaybackCompletion,
    PlaybackHandle,
};
pub use backend::{
    ElevenLabsConfig, ElevenLabsSynthesizer, RemoteTranscriber, SynthesizedAudio, Synthesizer,
    Transcriber,
};
pub use capture::{CaptureEvent, CaptureState, CaptureStatus, VoiceCaptureController};
pub use error::VoiceError;
pub use playback::{PlaybackEvent, PlaybackState, PlaybackStatus, SpeechPlaybackController};
pub use resource::{AudioResourceManager, ResourceKind, ResourceLease};
