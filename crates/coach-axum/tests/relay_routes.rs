//! Chat and transcription relay routes.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use coach_axum::openai::{MISSING_KEY_MESSAGE, OpenAiClient, OpenAiConfig};
use coach_axum::{AxumContext, CorsConfig, create_router};
use coach_core::{CompletionError, GENERIC_SYSTEM_MESSAGE, LearningMode, StreamFrame};
use coach_db::TestDb;
use coach_voice::{AudioEncoding, VoiceError};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use common::{FakeCompletion, FakeTranscriber, TestApp, body_text, json_request, parse_json};

fn chat_body(mode: &str, system_message: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "mode": mode,
        "messages": [
            { "role": "assistant", "content": "To start, type 'begin'" },
            { "role": "user", "content": "begin" }
        ]
    });
    if let Some(text) = system_message {
        body["systemMessage"] = json!(text);
    }
    body
}

fn frames(text: &str) -> Vec<StreamFrame> {
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn audio(content_type: &str, bytes: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/stt")
        .header("content-type", content_type)
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn chat_streams_ndjson_frames() {
    let app = TestApp::with(
        FakeCompletion::replying(vec![Ok("Which ".into()), Ok("path?".into())]),
        FakeTranscriber::replying(Ok(String::new())),
    )
    .await;

    let response = app
        .send(json_request("POST", "/api/chat", &chat_body("review", Some("Be brief."))))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/x-ndjson"
    );
    assert_eq!(
        frames(&body_text(response).await),
        vec![
            StreamFrame::Delta { content: "Which ".into() },
            StreamFrame::Delta { content: "path?".into() },
            StreamFrame::Done,
        ]
    );

    let request = &app.completion.requests()[0];
    assert_eq!(request.mode, Some(LearningMode::Review));
    assert_eq!(request.system_message, "Be brief.");
    assert_eq!(request.messages.len(), 2);
}

#[tokio::test]
async fn chat_without_instruction_uses_the_mode_default() {
    let app = TestApp::new().await;
    app.send(json_request("POST", "/api/chat", &chat_body("build", None)))
        .await;

    assert_eq!(
        app.completion.requests()[0].system_message,
        LearningMode::Build.default_system_message()
    );
}

#[tokio::test]
async fn chat_with_unknown_mode_uses_the_generic_instruction() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request("POST", "/api/chat", &chat_body("freestyle", Some(""))))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let request = &app.completion.requests()[0];
    assert_eq!(request.mode, None);
    assert_eq!(request.system_message, GENERIC_SYSTEM_MESSAGE);
}

#[tokio::test]
async fn chat_failure_mid_stream_ends_with_an_error_frame() {
    let app = TestApp::with(
        FakeCompletion::replying(vec![
            Ok("Half".into()),
            Err(CompletionError::Interrupted("upstream closed the stream early".into())),
        ]),
        FakeTranscriber::replying(Ok(String::new())),
    )
    .await;

    let response = app
        .send(json_request("POST", "/api/chat", &chat_body("review", None)))
        .await;
    let out = frames(&body_text(response).await);

    assert_eq!(out.len(), 2);
    assert_eq!(out[0], StreamFrame::Delta { content: "Half".into() });
    assert!(matches!(&out[1], StreamFrame::Error { message } if message.contains("early")));
}

#[tokio::test]
async fn chat_upstream_refusal_is_bad_gateway() {
    let app = TestApp::with(
        FakeCompletion::refusing(CompletionError::Upstream {
            status: 429,
            message: "Rate limit exceeded".into(),
        }),
        FakeTranscriber::replying(Ok(String::new())),
    )
    .await;

    let response = app
        .send(json_request("POST", "/api/chat", &chat_body("review", None)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(parse_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Rate limit"));
}

#[tokio::test]
async fn server_without_key_reports_missing_credential() {
    let db = TestDb::new().await.unwrap();
    let openai = Arc::new(OpenAiClient::new(OpenAiConfig::default()));
    let ctx = AxumContext::new(db.config_service(), openai.clone(), openai);
    let router = create_router(ctx, &CorsConfig::AllowAll);

    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/chat", &chat_body("review", None)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = parse_json(response).await;
    assert_eq!(body["error"], MISSING_KEY_MESSAGE);
    assert_eq!(body["type"], "MISSING_CREDENTIAL");

    let response = router.oneshot(audio("audio/webm", b"abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_json(response).await["type"], "MISSING_CREDENTIAL");
}

#[tokio::test]
async fn stt_returns_the_transcript() {
    let app = TestApp::new().await;
    let response = app.send(audio("audio/webm;codecs=opus", b"voice")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_json(response).await, json!({ "text": "hello" }));

    let received = app.transcriber.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].encoding, AudioEncoding::Webm);
    assert_eq!(&received[0].bytes[..], b"voice");
}

#[tokio::test]
async fn stt_rejects_unknown_content_types() {
    let app = TestApp::new().await;
    let response = app.send(audio("text/plain", b"voice")).await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(app.transcriber.received().is_empty());
}

#[tokio::test]
async fn stt_rejects_empty_recordings() {
    let app = TestApp::new().await;
    let response = app.send(audio("audio/wav", b"")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(parse_json(response).await["error"].is_string());
}

#[tokio::test]
async fn stt_upstream_failure_carries_an_error_body() {
    let app = TestApp::with(
        FakeCompletion::default(),
        FakeTranscriber::replying(Err(VoiceError::TranscriptionError("OpenAI HTTP 400: bad audio".into()))),
    )
    .await;

    let response = app.send(audio("audio/ogg", b"voice")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(parse_json(response).await["error"], "OpenAI HTTP 400: bad audio");
}
