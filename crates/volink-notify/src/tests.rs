use crate::error::NotifyError;
use crate::mailers::{LogMailer, MemoryMailer};
use crate::templates::{
    render_event, EVENT_APPLICATION_RECEIVED, EVENT_APPLICATION_STATUS, EVENT_OTP_CODE,
    EVENT_REGISTRATION_STATUS,
};
use crate::Mailer;

#[test]
fn otp_template_includes_code_and_expiry() {
    let (subject, body) =
        render_event(EVENT_OTP_CODE, &serde_json::json!({"code": "483921"})).unwrap();
    assert_eq!(subject, "Your login code");
    assert!(body.contains("483921"));
    assert!(body.contains("5 minutes"));

    let (_, body) = render_event(
        EVENT_OTP_CODE,
        &serde_json::json!({"code": "111111", "expires_minutes": 10}),
    )
    .unwrap();
    assert!(body.contains("10 minutes"));
}

#[test]
fn application_received_template_names_both_parties() {
    let (subject, body) = render_event(
        EVENT_APPLICATION_RECEIVED,
        &serde_json::json!({"volunteer_name": "Ada", "campaign_title": "Beach Cleanup"}),
    )
    .unwrap();
    assert!(subject.contains("Beach Cleanup"));
    assert!(body.contains("Ada"));
}

#[test]
fn status_template_varies_by_decision() {
    let approved = render_event(
        EVENT_APPLICATION_STATUS,
        &serde_json::json!({"campaign_title": "Beach Cleanup", "status": "approved"}),
    )
    .unwrap();
    assert!(approved.1.contains("approved"));

    let rejected = render_event(
        EVENT_APPLICATION_STATUS,
        &serde_json::json!({"campaign_title": "Beach Cleanup", "status": "rejected"}),
    )
    .unwrap();
    assert!(rejected.1.contains("not selected"));

    let reset = render_event(
        EVENT_REGISTRATION_STATUS,
        &serde_json::json!({"ngo_name": "Green Earth", "status": "pending"}),
    )
    .unwrap();
    assert!(reset.1.contains("back under review"));
}

#[test]
fn template_errors_are_distinct() {
    let unknown = render_event("password_reset", &serde_json::json!({}));
    assert!(matches!(unknown, Err(NotifyError::UnknownTemplate(_))));

    let missing = render_event(EVENT_OTP_CODE, &serde_json::json!({}));
    assert!(matches!(missing, Err(NotifyError::TemplateError(_))));

    let bad_status = render_event(
        EVENT_APPLICATION_STATUS,
        &serde_json::json!({"campaign_title": "X", "status": "archived"}),
    );
    assert!(matches!(bad_status, Err(NotifyError::TemplateError(_))));
}

#[tokio::test]
async fn memory_mailer_captures_sends_in_order() {
    let mailer = MemoryMailer::new();
    mailer.send("a@example.org", "first", "body 1").await.unwrap();
    mailer.send("b@example.org", "second", "body 2").await.unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "a@example.org");
    assert_eq!(sent[1].subject, "second");
    assert_eq!(mailer.mailer_type(), "memory");
}

#[tokio::test]
async fn log_mailer_always_succeeds() {
    let mailer = LogMailer;
    mailer
        .send("dev@example.org", "subject", "body")
        .await
        .unwrap();
    assert_eq!(mailer.mailer_type(), "log");
}
