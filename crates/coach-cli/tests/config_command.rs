//! `coach config` against a stub server.

use coach_cli::handlers::config::execute;
use coach_cli::{CliError, ConfigCommand};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stored() -> serde_json::Value {
    json!({
        "heading": "Feedback practice",
        "description": "Rehearse a conversation",
        "readymadeSystemMessage": "readymade",
        "buildSystemMessage": "build",
        "reviewSystemMessage": "review"
    })
}

fn set(heading: Option<&str>) -> ConfigCommand {
    ConfigCommand::Set {
        file: None,
        heading: heading.map(str::to_string),
        description: None,
        readymade: None,
        build: None,
        review: None,
    }
}

#[tokio::test]
async fn set_merges_flags_over_the_stored_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored()))
        .mount(&server)
        .await;

    let mut expected = stored();
    expected["heading"] = json!("New heading");
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(&expected))
        .expect(1)
        .mount(&server)
        .await;

    execute(&server.uri(), set(Some("New heading"))).await.unwrap();
}

#[tokio::test]
async fn set_on_an_empty_store_needs_every_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = execute(&server.uri(), set(Some("Only a heading")))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Arguments(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn set_without_values_is_rejected() {
    let server = MockServer::start().await;

    let err = execute(&server.uri(), set(None)).await.unwrap_err();

    assert!(matches!(err, CliError::Arguments(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn show_reports_an_unreachable_server() {
    let err = execute("http://127.0.0.1:9", ConfigCommand::Show { json: true })
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 69);
}
