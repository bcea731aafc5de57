//! CLI entry point.
//!
//! Command dispatch routes to handlers; `serve` and `chat` each build their
//! own context through a bootstrap module.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use coach_cli::handlers::serve::ServeArgs;
use coach_cli::{Cli, CliError, Commands, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let server_url = cli.server_url.as_deref();
    match command {
        Commands::Serve {
            port,
            database_url,
            openai_api_key,
            allowed_origins,
        } => {
            handlers::serve::execute(ServeArgs {
                port,
                database_url,
                openai_api_key,
                allowed_origins,
            })
            .await
        }
        Commands::Chat(args) => handlers::chat::execute(args, server_url).await,
        Commands::Config { command } => {
            let default_url = coach_core::ClientSettings::default().server_url;
            handlers::config::execute(server_url.unwrap_or(&default_url), command).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads `env = ...` arguments
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
