//! [`CompletionPort`] over the coach server's chat relay.

use async_trait::async_trait;
use coach_core::{CompletionError, CompletionPort, CompletionRequest, TokenStream};
use serde::Deserialize;

use super::ndjson;

/// Error type tag the server uses when it has no model credential.
const MISSING_CREDENTIAL: &str = "MISSING_CREDENTIAL";

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Streams completions from `POST {server}/api/chat`.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCompletionClient {
    pub fn new(server_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), server_url)
    }

    pub fn with_client(client: reqwest::Client, server_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl CompletionPort for HttpCompletionClient {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream, CompletionError> {
        tracing::debug!(
            mode = ?request.mode,
            messages = request.messages.len(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), &body));
        }

        Ok(ndjson::token_stream(response.bytes_stream()))
    }
}

fn error_from_body(status: u16, body: &str) -> CompletionError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                trimmed.to_string()
            }
        });

    if parsed.kind.as_deref() == Some(MISSING_CREDENTIAL) {
        CompletionError::MissingCredential(message)
    } else {
        CompletionError::Upstream { status, message }
    }
}
