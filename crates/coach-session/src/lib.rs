#![doc = include_str!("../README.md")]

pub mod autoread;
pub mod client;
pub mod error;
pub mod host;
pub mod session;

pub use autoread::AutoReadToggle;
pub use client::{ConfigClient, HttpCompletionClient};
pub use error::SessionError;
pub use host::SessionHost;
pub use session::{ConversationSession, SessionDeps, SessionEvent, SessionOptions};
