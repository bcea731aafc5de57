//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the coaching assistant.
#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Practice feedback conversations with an AI coach")]
#[command(version)]
pub struct Cli {
    /// Base URL of the coach server
    #[arg(long, env = "COACH_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "coach",
            "--verbose",
            "--server-url",
            "http://10.0.0.2:8787",
            "config",
            "show",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.server_url.as_deref(), Some("http://10.0.0.2:8787"));
    }
}
