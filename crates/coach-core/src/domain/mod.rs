//! Core domain types.
//!
//! Pure data structures with no infrastructure dependencies.

pub mod chat;
pub mod config;
pub mod mode;
pub mod stream;

pub use chat::{ChatMessage, MessageRole, WireMessage};
pub use config::{CoachConfig, CoachConfigDraft, ConfigValidationError, instruction_for};
pub use mode::{GENERIC_SYSTEM_MESSAGE, LearningMode, ModeProfile, PROFILES, UnknownModeError};
pub use stream::StreamFrame;
