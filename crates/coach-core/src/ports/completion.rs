//! Completion service port.
//!
//! A completion takes a role-tagged history plus an instruction string and
//! yields text deltas. Implementations: the OpenAI upstream client in
//! `coach-axum` and the HTTP relay client in `coach-session`.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{LearningMode, WireMessage};

/// Outbound completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// `None` when the caller named a mode this build does not know.
    pub mode: Option<LearningMode>,
    pub messages: Vec<WireMessage>,
    pub system_message: String,
}

/// Errors surfaced by a completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The backend has no credential configured. Not retried automatically.
    #[error("{0}")]
    MissingCredential(String),

    /// The request never reached the backend, or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status or an error payload.
    #[error("Completion service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The response stopped before it was complete.
    #[error("Response interrupted: {0}")]
    Interrupted(String),

    /// The stream carried something that could not be decoded.
    #[error("Malformed completion stream: {0}")]
    Protocol(String),
}

/// Ordered stream of text deltas.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// Backend-agnostic streaming completion.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    /// Start a completion. Credential and connection failures are returned
    /// before any delta; failures mid-stream arrive as stream items.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream, CompletionError>;
}
