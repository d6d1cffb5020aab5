//! Shared helpers for the router tests

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use snipnet::{AppState, config::SessionConfig, credentials::CredentialVerifier, routes};
use tower::ServiceExt;

pub const PASSWORD: &str = "S3cret!pass";

pub fn verifier() -> CredentialVerifier {
    CredentialVerifier::with_cost(64, 1).expect("valid argon2 parameters")
}

pub fn state() -> AppState {
    AppState::in_memory(verifier(), SessionConfig::default())
}

pub fn app() -> Router {
    routes::create_router(state())
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("valid request")
}

/// Send a request and decode the JSON body, `Value::Null` when empty
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");

    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

pub struct Account {
    pub id: String,
    pub token: String,
}

/// Sign up and sign in `username`
pub async fn register(app: &Router, username: &str) -> Account {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/signup",
            None,
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/signin",
            None,
            Some(json!({ "username": username, "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    Account {
        id: body["data"]["id"].as_str().expect("user id").to_string(),
        token: body["data"]["auth_token"].as_str().expect("token").to_string(),
    }
}

pub fn snippet_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "demo snippet",
        "language": "rust",
        "code": "fn main() {}",
    })
}

/// Create a snippet and return its id
pub async fn create_snippet(app: &Router, token: &str, body: Value) -> String {
    let (status, body) = send(app, request(Method::POST, "/snippets", Some(token), Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().expect("snippet id").to_string()
}
