//! Coach configuration over `GET`/`POST {server}/api/config`.

use coach_core::{CoachConfig, CoreError};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Reads and replaces the server's coach configuration.
pub struct ConfigClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ConfigClient {
    pub fn new(server_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), server_url)
    }

    pub fn with_client(client: reqwest::Client, server_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/config", server_url.trim_end_matches('/')),
        }
    }

    /// Latest configuration, `None` when nothing was stored yet.
    pub async fn fetch(&self) -> Result<Option<CoachConfig>, CoreError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CoreError::ExternalService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::ExternalService(
                error_message(status, response).await,
            ));
        }

        response
            .json::<Option<CoachConfig>>()
            .await
            .map_err(|e| CoreError::ExternalService(format!("unreadable configuration: {e}")))
    }

    /// Replace the stored configuration. The server rejects blank fields
    /// with `400`, surfaced as [`CoreError::Validation`].
    pub async fn replace(&self, config: &CoachConfig) -> Result<CoachConfig, CoreError> {
        config.validate()?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(config)
            .send()
            .await
            .map_err(|e| CoreError::ExternalService(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(CoreError::Validation(error_message(status, response).await));
        }
        if !status.is_success() {
            return Err(CoreError::ExternalService(
                error_message(status, response).await,
            ));
        }

        response
            .json::<CoachConfig>()
            .await
            .map_err(|e| CoreError::ExternalService(format!("unreadable configuration: {e}")))
    }
}

async fn error_message(status: reqwest::StatusCode, response: reqwest::Response) -> String {
    let body: ErrorBody = response.json().await.unwrap_or_default();
    body.error.unwrap_or_else(|| format!("HTTP {status}"))
}
