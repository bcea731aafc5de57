//! HTTP clients for the coach server.

mod completion;
mod config;
mod ndjson;

pub use completion::HttpCompletionClient;
pub use config::ConfigClient;
