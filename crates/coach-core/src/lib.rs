#![doc = include_str!("../README.md")]

pub mod domain;
pub mod paths;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    ChatMessage, CoachConfig, CoachConfigDraft, ConfigValidationError, GENERIC_SYSTEM_MESSAGE,
    LearningMode, MessageRole, ModeProfile, PROFILES, StreamFrame, WireMessage, instruction_for,
};
pub use paths::{PathError, data_root, database_path};
pub use ports::{
    CompletionError, CompletionPort, CompletionRequest, ConfigRepository, CoreError,
    RepositoryError, TokenStream,
};
pub use services::ConfigService;
pub use settings::{
    ClientSettings, DEFAULT_CHUNK_SIZE, DEFAULT_SERVER_PORT, SettingsError, validate_settings,
};
