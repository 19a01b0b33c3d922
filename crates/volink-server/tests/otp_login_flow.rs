mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    assert_err_envelope, assert_ok_envelope, build_test_context, extract_otp_code, latest_mail_to,
    register_ngo, request_json, request_no_body,
};
use serde_json::json;

#[tokio::test]
async fn send_should_validate_email_and_keep_the_code_out_of_the_response() {
    let ctx = build_test_context().await.expect("test context should build");

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": "Login@Example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    // The code travels only in the mail
    assert!(body["data"].is_null());

    let mail = latest_mail_to(&ctx.outbox, "login@example.org").expect("OTP mail should be sent");
    let code = extract_otp_code(&ctx.outbox, "login@example.org");
    assert_eq!(code.len(), 6);
    assert!(mail.body.contains(&code));
}

#[tokio::test]
async fn verify_should_create_a_volunteer_profile_and_mint_a_magic_link() {
    let ctx = build_test_context().await.expect("test context should build");
    let email = "fresh@example.org";

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = extract_otp_code(&ctx.outbox, email);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": email, "otp": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["account_type"], "volunteer");
    let token = body["data"]["access_token"].as_str().expect("token").to_string();
    let magic_link = body["data"]["magic_link"].as_str().expect("magic link");
    assert_eq!(
        magic_link,
        format!("http://localhost:8080/auth/callback#token={token}")
    );

    // The session works like any other
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], email);
    assert_eq!(body["data"]["account_type"], "volunteer");

    // The account has no password, so password login points back at OTP
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "whatever-123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);
}

#[tokio::test]
async fn verify_should_reuse_the_existing_profile_and_keep_its_role() {
    let ctx = build_test_context().await.expect("test context should build");
    let (_, ngo_id) = register_ngo(&ctx.app, "org@example.org", "Green Earth").await;

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": "org@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = extract_otp_code(&ctx.outbox, "org@example.org");

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": "org@example.org", "otp": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["profile_id"], ngo_id.as_str());
    assert_eq!(body["data"]["account_type"], "ngo");
}

#[tokio::test]
async fn codes_should_be_single_use() {
    let ctx = build_test_context().await.expect("test context should build");
    let email = "once@example.org";

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = extract_otp_code(&ctx.outbox, email);

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": email, "otp": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Replaying the same code fails like any bad code
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": email, "otp": code})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1103);
}

#[tokio::test]
async fn resend_should_replace_the_previous_code() {
    let ctx = build_test_context().await.expect("test context should build");
    let email = "again@example.org";

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first = ctx
        .state
        .store
        .get_live_otp_code(email)
        .await
        .expect("store should answer")
        .expect("a live code should exist");

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second = ctx
        .state
        .store
        .get_live_otp_code(email)
        .await
        .expect("store should answer")
        .expect("a live code should exist");

    // A new row took the old one's place
    assert_ne!(first.id, second.id);
    assert_eq!(second.otp_code, extract_otp_code(&ctx.outbox, email));

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": email, "otp": second.otp_code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
}

#[tokio::test]
async fn verify_should_distinguish_wrong_code_from_expired_code() {
    let ctx = build_test_context().await.expect("test context should build");

    // No code requested at all
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": "nobody@example.org", "otp": "123456"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1103);

    // A live code, but the wrong guess
    ctx.state
        .store
        .replace_otp_code(
            "guess@example.org",
            "135791",
            Utc::now() + Duration::minutes(5),
        )
        .await
        .expect("code should store");
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": "guess@example.org", "otp": "000000"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1103);

    // The right code, past its window
    ctx.state
        .store
        .replace_otp_code(
            "late@example.org",
            "246802",
            Utc::now() - Duration::minutes(1),
        )
        .await
        .expect("code should store");
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": "late@example.org", "otp": "246802"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1104);
}

#[tokio::test]
async fn successful_verify_should_sweep_expired_codes_for_everyone() {
    let ctx = build_test_context().await.expect("test context should build");

    // A stale code belonging to someone else
    ctx.state
        .store
        .replace_otp_code(
            "stale@example.org",
            "111111",
            Utc::now() - Duration::minutes(10),
        )
        .await
        .expect("code should store");

    let email = "active@example.org";
    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/send",
        None,
        Some(json!({"email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = extract_otp_code(&ctx.outbox, email);

    let (status, _, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/otp/verify",
        None,
        Some(json!({"email": email, "otp": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let leftover = ctx
        .state
        .store
        .get_live_otp_code("stale@example.org")
        .await
        .expect("store should answer");
    assert!(leftover.is_none(), "expired code should have been purged");
}
