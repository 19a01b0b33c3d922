// Email-code login (OTP)
//
// The server generates and stores the code; the client never sees it
// outside the email. Verification is single-use with distinct error codes
// for "wrong code" and "expired code", and each verify call opportunistically
// purges expired rows across all emails.

use crate::api::{
    error_response, is_valid_email, issue_session, success_empty_response, success_response,
    ApiError,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_common::types::{AccountType, SendOtpRequest, VerifyOtpRequest};
use volink_storage::auth::{constant_time_eq, generate_otp_code};
use volink_storage::NewProfile;

/// OTP 登录会话响应：会话令牌外加可嵌入邮件的魔法链接
#[derive(Serialize, ToSchema)]
pub struct OtpAuthResponse {
    /// JWT Access Token
    pub access_token: String,
    /// Token 有效期（秒）
    pub expires_in: u64,
    /// 账号对应的档案 ID
    pub profile_id: String,
    /// 派生角色：volunteer 或 ngo
    pub account_type: AccountType,
    /// 魔法链接：`{public_base_url}/auth/callback#token={jwt}`
    pub magic_link: String,
}

/// 发送邮箱登录验证码。
/// 每个邮箱同一时刻最多一个有效验证码；重发会替换旧码。
/// 验证码只出现在邮件里，绝不出现在响应或日志中。
#[utoipa::path(
    post,
    path = "/v1/auth/otp/send",
    tag = "Auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "验证码已发送"),
        (status = 400, description = "邮箱不合法", body = ApiError),
        (status = 503, description = "邮件通道不可用", body = ApiError)
    )
)]
async fn send_otp(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> impl IntoResponse {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "A valid email address is required",
        );
    }

    let code = generate_otp_code();
    let expiry_secs = state.config.otp.expiry_secs;
    let expires_at = Utc::now() + Duration::seconds(expiry_secs as i64);
    if let Err(e) = state.store.replace_otp_code(&email, &code, expires_at).await {
        tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to store OTP code");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "storage_error",
            "Failed to send code",
        );
    }

    let payload = json!({
        "code": code,
        "expires_minutes": expiry_secs / 60,
    });
    let (subject, body) = match volink_notify::templates::render_event(
        volink_notify::templates::EVENT_OTP_CODE,
        &payload,
    ) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "OTP mail template failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to send code",
            );
        }
    };

    // Unlike event mail, the code email IS the operation; a failed send
    // must fail the request so the client can retry.
    if let Err(e) = state.mailer.send(&email, &subject, &body).await {
        tracing::error!(trace_id = %trace_id.0, error = %e, "OTP mail delivery failed");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &trace_id,
            "mail_unavailable",
            "Mail delivery is unavailable, try again later",
        );
    }

    tracing::info!(trace_id = %trace_id.0, email = %email, "OTP code issued");
    success_empty_response(StatusCode::OK, &trace_id, "verification code sent")
}

/// 校验邮箱验证码并登录。
/// 验证码单次有效；错码与过期返回不同错误码。
/// 首次登录自动创建志愿者档案；响应附带魔法链接。
#[utoipa::path(
    post,
    path = "/v1/auth/otp/verify",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "登录成功，返回会话令牌与魔法链接", body = OtpAuthResponse),
        (status = 400, description = "参数不合法", body = ApiError),
        (status = 401, description = "验证码错误或已过期", body = ApiError)
    )
)]
async fn verify_otp(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> impl IntoResponse {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "A valid email address is required",
        );
    }
    let otp = req.otp.trim();

    let row = match state.store.get_live_otp_code(&email).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "otp_invalid",
                "Invalid verification code",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load OTP code");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to verify code",
            );
        }
    };

    if !constant_time_eq(&row.otp_code, otp) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "otp_invalid",
            "Invalid verification code",
        );
    }
    if row.expires_at < Utc::now() {
        return error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "otp_expired",
            "Verification code expired, request a new one",
        );
    }

    if let Err(e) = state.store.mark_otp_code_used(&row.id).await {
        tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to mark OTP code used");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "storage_error",
            "Failed to verify code",
        );
    }

    let profile = match state.store.get_profile_by_email(&email).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            // First login: the code proves mailbox ownership, so create a
            // volunteer profile with no password.
            let new = NewProfile {
                email: email.clone(),
                password_hash: None,
                is_ngo: false,
                full_name: None,
                ngo_name: None,
            };
            match state.store.create_profile(&new).await {
                Ok(profile) => {
                    tracing::info!(
                        trace_id = %trace_id.0,
                        profile_id = %profile.id,
                        "Profile created on first OTP login"
                    );
                    profile
                }
                Err(e) => {
                    tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to create profile");
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &trace_id,
                        "storage_error",
                        "Failed to verify code",
                    );
                }
            }
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load profile");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to verify code",
            );
        }
    };

    let session = match issue_session(&state, &profile) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to sign session token");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to verify code",
            );
        }
    };
    let magic_link = format!(
        "{}/auth/callback#token={}",
        state.config.public_base_url.trim_end_matches('/'),
        session.access_token
    );

    // Opportunistic cleanup: verify traffic keeps the table from growing.
    match state.store.purge_expired_otp_codes(Utc::now()).await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(trace_id = %trace_id.0, purged, "Purged expired OTP codes"),
        Err(e) => tracing::warn!(trace_id = %trace_id.0, error = %e, "OTP cleanup failed"),
    }

    tracing::info!(trace_id = %trace_id.0, profile_id = %profile.id, "OTP login succeeded");
    success_response(
        StatusCode::OK,
        &trace_id,
        OtpAuthResponse {
            access_token: session.access_token,
            expires_in: session.expires_in,
            profile_id: session.profile_id,
            account_type: session.account_type,
            magic_link,
        },
    )
}

pub fn otp_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(send_otp))
        .routes(routes!(verify_otp))
}
