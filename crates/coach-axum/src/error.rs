//! Axum-specific error types and mappings.
//!
//! Every failure leaves the server as JSON `{error, status, type?}`. The
//! `type` discriminant is only set where clients branch on it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coach_core::{CompletionError, CoreError, RepositoryError};
use coach_voice::VoiceError;
use serde::Serialize;
use thiserror::Error;

/// Stable `type` tag for a missing upstream credential.
pub const MISSING_CREDENTIAL: &str = "MISSING_CREDENTIAL";

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body is not in a format this route accepts.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The server has no credential for an upstream service.
    #[error("{0}")]
    MissingCredential(String),

    /// An upstream service failed or answered with an error.
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    /// Stable error type discriminant for client-side handling
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    error_type: Option<&'static str>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message, error_type) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg, None),
            Self::MissingCredential(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                Some(MISSING_CREDENTIAL),
            ),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
            error_type,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => repo_err.into(),
            CoreError::Settings(settings_err) => Self::BadRequest(settings_err.to_string()),
            CoreError::Validation(msg) => Self::BadRequest(msg),
            CoreError::Configuration(msg) => Self::Internal(format!("Config: {msg}")),
            CoreError::ExternalService(msg) => Self::BadGateway(msg),
            CoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<RepositoryError> for HttpError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => Self::NotFound(msg),
            RepositoryError::Storage(msg) => Self::Internal(format!("Storage: {msg}")),
            RepositoryError::Serialization(msg) => Self::Internal(format!("Serialization: {msg}")),
            RepositoryError::Constraint(msg) => Self::BadRequest(msg),
        }
    }
}

impl From<CompletionError> for HttpError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::MissingCredential(msg) => Self::MissingCredential(msg),
            other => Self::BadGateway(other.to_string()),
        }
    }
}

impl From<VoiceError> for HttpError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::MissingCredential(msg) => Self::MissingCredential(msg),
            VoiceError::EmptyRecording => Self::BadRequest(err.to_string()),
            VoiceError::UnsupportedEncoding(msg) => Self::UnsupportedMediaType(msg),
            VoiceError::TranscriptionError(msg) => Self::BadGateway(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: HttpError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_credential_is_tagged() {
        let (status, body) = render(CompletionError::MissingCredential("no key".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "no key");
        assert_eq!(body["status"], 500);
        assert_eq!(body["type"], MISSING_CREDENTIAL);
    }

    #[tokio::test]
    async fn validation_is_a_plain_bad_request() {
        let (status, body) = render(CoreError::Validation("Missing required fields".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
        assert!(body.get("type").is_none());
    }

    #[tokio::test]
    async fn upstream_failures_are_bad_gateway() {
        let err = CompletionError::Upstream {
            status: 429,
            message: "slow down".into(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("slow down"));
    }
}
