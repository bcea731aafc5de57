//! Config store routes.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, get, json_request, parse_json};

fn full_config(heading: &str) -> serde_json::Value {
    json!({
        "heading": heading,
        "description": "Practice feedback",
        "readymadeSystemMessage": "r",
        "buildSystemMessage": "b",
        "reviewSystemMessage": "v"
    })
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_text(response).await, "OK");
}

#[tokio::test]
async fn empty_store_returns_null() {
    let app = TestApp::new().await;
    let response = app.send(get("/api/config")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_json(response).await, serde_json::Value::Null);
}

#[tokio::test]
async fn post_then_get_returns_the_five_fields() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request("POST", "/api/config", &full_config("Lead well")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_json(response).await, full_config("Lead well"));

    let stored = parse_json(app.send(get("/api/config")).await).await;
    assert_eq!(stored, full_config("Lead well"));
}

#[tokio::test]
async fn second_post_fully_replaces() {
    let app = TestApp::new().await;
    app.send(json_request("POST", "/api/config", &full_config("First")))
        .await;

    let mut second = full_config("Second");
    second["reviewSystemMessage"] = json!("v2");
    app.send(json_request("POST", "/api/config", &second)).await;

    assert_eq!(parse_json(app.send(get("/api/config")).await).await, second);
}

#[tokio::test]
async fn missing_field_is_rejected_without_writing() {
    let app = TestApp::new().await;

    let mut partial = full_config("Lead well");
    partial.as_object_mut().unwrap().remove("buildSystemMessage");
    let response = app.send(json_request("POST", "/api/config", &partial)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_json(response).await;
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Missing required fields"), "{error}");
    assert!(error.contains("buildSystemMessage"), "{error}");

    let stored = parse_json(app.send(get("/api/config")).await).await;
    assert_eq!(stored, serde_json::Value::Null);
}

#[tokio::test]
async fn blank_field_counts_as_missing() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request("POST", "/api/config", &full_config("   ")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/config")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(parse_json(response).await["error"].is_string());
}

#[tokio::test]
async fn admin_alias_shares_the_store() {
    let app = TestApp::new().await;
    app.send(json_request("POST", "/api/admin", &full_config("Via admin")))
        .await;

    assert_eq!(
        parse_json(app.send(get("/api/config")).await).await,
        full_config("Via admin")
    );
    assert_eq!(
        parse_json(app.send(get("/api/admin")).await).await,
        full_config("Via admin")
    );
}
