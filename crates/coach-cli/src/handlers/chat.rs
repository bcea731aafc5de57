//! Chat command handler.
//!
//! Builds the chat context and hands the terminal to the shell.

use coach_core::LearningMode;

use crate::bootstrap::{CliConfig, bootstrap_chat};
use crate::commands::ChatArgs;
use crate::error::CliError;
use crate::shell;

/// Mode named with `--mode`, checked before anything is wired.
pub fn initial_mode(args: &ChatArgs) -> Result<Option<LearningMode>, CliError> {
    args.mode
        .as_deref()
        .map(|tag| {
            LearningMode::parse(tag).ok_or_else(|| {
                CliError::Arguments(format!(
                    "Unknown mode '{tag}'. Choose readymade, build or review."
                ))
            })
        })
        .transpose()
}

/// Execute the chat command.
pub async fn execute(args: ChatArgs, server_url: Option<&str>) -> Result<(), CliError> {
    let mode = initial_mode(&args)?;
    let ctx = bootstrap_chat(CliConfig::from_chat_args(&args, server_url)).await?;
    shell::run(ctx, mode).await
}
