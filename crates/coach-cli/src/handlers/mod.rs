//! Command handlers.
//!
//! Each handler is a thin wrapper that:
//! 1. Validates CLI-specific input
//! 2. Calls the server adapter, the config client or the shell
//! 3. Formats output for the terminal
//!
//! Handlers do not open the database themselves; `serve` goes through the
//! axum bootstrap and `config` goes through the running server.

pub mod chat;
pub mod config;
pub mod serve;
