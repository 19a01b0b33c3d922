#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::util::ServiceExt;
use volink_ai::MatchEngine;
use volink_notify::mailers::{MemoryMailer, OutboundMail};
use volink_notify::Mailer;
use volink_server::app;
use volink_server::config::ServerConfig;
use volink_server::state::AppState;
use volink_storage::HubStore;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
    /// Captures every mail the server tries to send.
    pub outbox: Arc<MemoryMailer>,
}

fn ensure_rustls_provider() {
    static RUSTLS_PROVIDER_INIT: OnceLock<()> = OnceLock::new();
    RUSTLS_PROVIDER_INIT.get_or_init(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with_matcher(None).await
}

pub async fn build_test_context_with_matcher(
    matcher: Option<Arc<dyn MatchEngine>>,
) -> Result<TestContext> {
    volink_common::id::init(1, 1);
    ensure_rustls_provider();

    let temp_dir = tempfile::tempdir()?;
    let db_url = format!(
        "sqlite://{}/volink-test.db?mode=rwc",
        temp_dir.path().to_string_lossy()
    );
    let store = Arc::new(HubStore::new(&db_url, temp_dir.path()).await?);
    let outbox = Arc::new(MemoryMailer::new());
    let mailer: Arc<dyn Mailer> = outbox.clone();

    let state = AppState::new(
        store,
        mailer,
        matcher,
        "test-secret".to_string(),
        ServerConfig::default(),
    );
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
        outbox,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let req = builder.body(Body::empty()).expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

/// Registers a volunteer account and returns (access_token, profile_id).
pub async fn register_volunteer(
    app: &axum::Router,
    email: &str,
    full_name: &str,
) -> (String, String) {
    register_account(
        app,
        json!({
            "email": email,
            "password": "volunteer-pass-1",
            "account_type": "volunteer",
            "full_name": full_name
        }),
    )
    .await
}

/// Registers an NGO account and returns (access_token, profile_id).
pub async fn register_ngo(app: &axum::Router, email: &str, ngo_name: &str) -> (String, String) {
    register_account(
        app,
        json!({
            "email": email,
            "password": "ngo-pass-0001",
            "account_type": "ngo",
            "ngo_name": ngo_name
        }),
    )
    .await
}

async fn register_account(app: &axum::Router, body: Value) -> (String, String) {
    let (status, body, _) = request_json(app, "POST", "/v1/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ok_envelope(&body);
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access_token should exist")
        .to_string();
    let profile_id = body["data"]["profile_id"]
        .as_str()
        .expect("profile_id should exist")
        .to_string();
    (token, profile_id)
}

/// Creates a campaign under the given NGO token and returns its id.
pub async fn create_campaign(app: &axum::Router, ngo_token: &str, title: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/campaigns",
        Some(ngo_token),
        Some(json!({
            "title": title,
            "description": "Help sort donations at the warehouse",
            "location": "Springfield",
            "category": "Community"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ok_envelope(&body);
    body["data"]["id"]
        .as_str()
        .expect("campaign id should exist")
        .to_string()
}

/// Pulls the 6-digit code out of the most recent mail sent to `email`.
pub fn extract_otp_code(outbox: &MemoryMailer, email: &str) -> String {
    let mail = latest_mail_to(outbox, email).expect("an OTP mail should have been sent");
    let bytes = mail.body.as_bytes();
    for window_start in 0..bytes.len().saturating_sub(5) {
        let window = &bytes[window_start..window_start + 6];
        if window.iter().all(u8::is_ascii_digit) {
            let before_ok = window_start == 0 || !bytes[window_start - 1].is_ascii_digit();
            let after = window_start + 6;
            let after_ok = after >= bytes.len() || !bytes[after].is_ascii_digit();
            if before_ok && after_ok {
                return String::from_utf8_lossy(window).to_string();
            }
        }
    }
    panic!("no 6-digit code found in mail body: {}", mail.body);
}

pub fn latest_mail_to(outbox: &MemoryMailer, email: &str) -> Option<OutboundMail> {
    outbox.sent().into_iter().rev().find(|m| m.to == email)
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}

pub fn make_json_body<T: serde::Serialize>(v: &T) -> Value {
    serde_json::to_value(v).expect("json encode should succeed")
}
