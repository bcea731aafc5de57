#![doc = include_str!("../README.md")]

pub mod bootstrap;
pub mod commands;
pub mod config_commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod shell;

// Re-export primary types for convenient access
pub use bootstrap::{ChatContext, CliConfig, bootstrap_chat};
pub use commands::{ChatArgs, Commands};
pub use config_commands::ConfigCommand;
pub use error::CliError;
pub use parser::Cli;
