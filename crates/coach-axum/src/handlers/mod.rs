//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for one API area. Handlers are thin:
//! they translate between HTTP and the services held in `AppState`.

pub mod chat;
pub mod config;
pub mod stt;
