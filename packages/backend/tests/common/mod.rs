#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use quest_backend::config::Config;

pub const TEACHER: (&str, &str) = ("선생님", "1234");
pub const STUDENT: (&str, &str) = ("김민지", "1111");
pub const OTHER_STUDENT: (&str, &str) = ("이서준", "2222");

pub fn test_config() -> Config {
    Config {
        app_id: "test-app".to_string(),
        session_secret: Some("test-secret".to_string()),
        seed_demo_accounts: true,
        bcrypt_cost: 4,
        llm_mock: true,
        ..Config::default()
    }
}

pub async fn create_test_app() -> Router {
    let state = quest_backend::build_state(&test_config())
        .await
        .expect("test state");
    quest_backend::create_app(state)
}

pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn login(app: &Router, (name, code): (&str, &str)) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "displayName": name, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user_id = body["data"]["userId"].as_str().unwrap().to_string();
    (token, user_id)
}
