//! Configuration management subcommands.

use clap::Subcommand;
use std::path::PathBuf;

/// Config store commands. Both go through the server's `/api/config`.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the stored configuration
    #[command(alias = "get")]
    Show {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the stored configuration
    ///
    /// Fields not given keep their current value; the whole record is
    /// then written back.
    Set {
        /// JSON file with any of the five camelCase fields
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        heading: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Instruction for the readymade (Rehearse & Explain) mode
        #[arg(long)]
        readymade: Option<String>,
        /// Instruction for the build (Prepare & Reflect) mode
        #[arg(long)]
        build: Option<String>,
        /// Instruction for the review (Review & Relate) mode
        #[arg(long)]
        review: Option<String>,
    },
}
