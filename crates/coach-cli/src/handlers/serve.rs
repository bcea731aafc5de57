//! Serve command handler.
//!
//! Runs the HTTP server: config store, chat relay and transcription relay.

use coach_axum::{OpenAiConfig, ServerConfig, start_server};

use crate::error::CliError;

/// Arguments for the serve command.
#[derive(Debug, Clone)]
pub struct ServeArgs {
    pub port: u16,
    pub database_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub allowed_origins: Vec<String>,
}

/// Build the server configuration from command-line values.
pub fn server_config(args: ServeArgs) -> ServerConfig {
    let ServeArgs {
        port,
        database_url,
        openai_api_key,
        allowed_origins,
    } = args;

    let mut config = ServerConfig::with_defaults();
    config.port = port;
    config.database_url = database_url;
    config.openai = OpenAiConfig::default().with_api_key(openai_api_key);
    if !allowed_origins.is_empty() {
        config = config.with_allowed_origins(allowed_origins);
    }
    config
}

/// Execute the serve command. Runs until Ctrl-C.
pub async fn execute(args: ServeArgs) -> Result<(), CliError> {
    let config = server_config(args);

    println!("Coach server on http://localhost:{}", config.port);
    println!("  GET/POST /api/config   coach configuration");
    println!("  POST     /api/chat     streamed chat relay");
    println!("  POST     /api/stt      speech to text");
    if !config.openai.has_credential() {
        println!("⚠️  OPENAI_API_KEY is not set; chat and transcription will fail.");
    }
    println!("Press Ctrl-C to stop.");

    start_server(config)
        .await
        .map_err(|e| CliError::Server(format!("{e:#}")))
}
