//! Session error types.

use coach_core::CompletionError;
use coach_voice::VoiceError;
use thiserror::Error;

/// Errors returned by [`ConversationSession`](crate::ConversationSession) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The input was rejected before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// A response is still streaming; wait for it or abort it first.
    #[error("A response is already in progress")]
    RequestInFlight,

    /// There is no user message to re-send.
    #[error("Nothing to retry")]
    NothingToRetry,

    /// The session was closed.
    #[error("Session is closed")]
    Closed,

    /// The completion service failed.
    #[error("Failed to connect to AI: {0}")]
    Completion(#[from] CompletionError),

    /// Capture, transcription or playback failed.
    #[error(transparent)]
    Voice(#[from] VoiceError),
}

impl SessionError {
    /// Whether the failure should be shown to the user as the session's
    /// current error.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(self, Self::Closed | Self::Voice(VoiceError::Cancelled))
    }
}
