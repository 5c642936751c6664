//! Drives the full router over in-memory stores.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{app::build_app, config::AppConfig, state::AppState};

pub fn app() -> Router {
    build_app(AppState::in_memory(AppConfig::for_tests()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> axum::http::Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("request");
    app.clone().oneshot(request).await.expect("response")
}

/// Sends a request and decodes the JSON response body (`Null` when empty).
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let resp = send(app, method, uri, token, body).await;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Sends a request and returns the raw headers and text body.
pub async fn call_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, HeaderMap, String) {
    let resp = send(app, method, uri, token, None).await;
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, headers, String::from_utf8(bytes.to_vec()).expect("utf-8"))
}

pub async fn register(app: &Router, username: &str, password: &str, role: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": password, "role": role })),
    )
    .await
}

pub async fn login_token(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_string()
}

/// Registers `username` with `role` and logs in.
pub async fn token_for(app: &Router, username: &str, role: &str) -> String {
    let (status, body) = register(app, username, "password123", role).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    login_token(app, username, "password123").await
}
