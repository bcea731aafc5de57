#![doc = include_str!("../README.md")]

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod openai;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, bootstrap, start_server};
pub use error::HttpError;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use routes::create_router;
pub use state::AppState;
