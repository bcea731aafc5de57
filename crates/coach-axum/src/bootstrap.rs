//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the web adapter. All concrete implementations are instantiated here.

use std::sync::Arc;

use anyhow::Result;
use coach_core::paths::database_path;
use coach_core::{CompletionPort, ConfigService, DEFAULT_SERVER_PORT};
use coach_db::{CoreFactory, setup_database};
use coach_voice::Transcriber;

use crate::openai::{OpenAiClient, OpenAiConfig};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// `SQLite` connection URL. `None` uses the file under the data root.
    pub database_url: Option<String>,
    /// Upstream model service.
    pub openai: OpenAiConfig,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Default port, default database location, no credential.
    pub fn with_defaults() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            database_url: None,
            openai: OpenAiConfig::default(),
            cors: CorsConfig::default(),
        }
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    /// Persisted coach configuration.
    pub config: ConfigService,
    /// Upstream chat completions.
    pub completion: Arc<dyn CompletionPort>,
    /// Upstream transcription.
    pub transcriber: Arc<dyn Transcriber>,
}

impl AxumContext {
    pub fn new(
        config: ConfigService,
        completion: Arc<dyn CompletionPort>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            config,
            completion,
            transcriber,
        }
    }
}

/// Bootstrap the server with all services.
pub async fn bootstrap(config: ServerConfig) -> Result<AxumContext> {
    // 1. Database pool with schema
    let pool = if let Some(url) = &config.database_url {
        tracing::info!(target: "coach.paths", database_url = %url, "Axum bootstrap database");
        CoreFactory::create_pool(url).await?
    } else {
        let db_path = database_path()?;
        tracing::info!(
            target: "coach.paths",
            database_path = %db_path.display(),
            "Axum bootstrap database"
        );
        setup_database(&db_path).await?
    };

    // 2. Upstream client, shared by both relay routes
    if !config.openai.has_credential() {
        tracing::warn!("OPENAI_API_KEY is not set; /api/chat and /api/stt will answer 500");
    }
    let openai = Arc::new(OpenAiClient::new(config.openai));

    Ok(AxumContext::new(
        CoreFactory::config_service(pool),
        openai.clone(),
        openai,
    ))
}

/// Start the web server on the configured port.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let port = config.port;
    let cors = config.cors.clone();
    let ctx = bootstrap(config).await?;
    let app = crate::routes::create_router(ctx, &cors);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("coach server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("coach server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
