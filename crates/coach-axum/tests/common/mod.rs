//! Shared fixtures for route tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use coach_axum::{AxumContext, CorsConfig, create_router};
use coach_core::{CompletionError, CompletionPort, CompletionRequest, TokenStream};
use coach_db::TestDb;
use coach_voice::{AudioPayload, Transcriber, VoiceError};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Completion backend that replays fixed items and records requests.
#[derive(Default)]
pub struct FakeCompletion {
    items: Vec<Result<String, CompletionError>>,
    refusal: Option<CompletionError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn replying(items: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn refusing(error: CompletionError) -> Self {
        Self {
            refusal: Some(error),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionPort for FakeCompletion {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream, CompletionError> {
        self.requests.lock().unwrap().push(request);
        if let Some(err) = &self.refusal {
            return Err(err.clone());
        }
        Ok(Box::pin(futures_util::stream::iter(self.items.clone())))
    }
}

/// Transcriber with one canned answer.
pub struct FakeTranscriber {
    reply: Result<String, VoiceError>,
    received: Mutex<Vec<AudioPayload>>,
}

impl FakeTranscriber {
    pub fn replying(reply: Result<String, VoiceError>) -> Self {
        Self {
            reply,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<AudioPayload> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String, VoiceError> {
        self.received.lock().unwrap().push(payload);
        self.reply.clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub completion: Arc<FakeCompletion>,
    pub transcriber: Arc<FakeTranscriber>,
    _db: TestDb,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(
            FakeCompletion::replying(vec![Ok("ok".into())]),
            FakeTranscriber::replying(Ok("hello".into())),
        )
        .await
    }

    pub async fn with(completion: FakeCompletion, transcriber: FakeTranscriber) -> Self {
        let db = TestDb::new().await.unwrap();
        let completion = Arc::new(completion);
        let transcriber = Arc::new(transcriber);
        let ctx = AxumContext::new(db.config_service(), completion.clone(), transcriber.clone());
        Self {
            router: create_router(ctx, &CorsConfig::AllowAll),
            completion,
            transcriber,
            _db: db,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn parse_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
