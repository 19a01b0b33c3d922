pub mod applications;
pub mod campaigns;
pub mod matching;
pub mod notifications;
pub mod otp;
pub mod pagination;
pub mod profiles;
pub mod registrations;

use crate::auth::create_token;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_common::types::{AccountType, AuthResponse, LoginRequest, RegisterRequest};
use volink_storage::{NewProfile, ProfileFilter, ProfileRow};

/// API 错误响应
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// 错误码
    pub err_code: i32,
    /// 错误信息
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
}

/// API 统一响应包裹
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 错误码（成功时为 0）
    pub err_code: i32,
    /// 错误信息（成功时为 success）
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
    /// 业务数据（有数据时返回）
    pub data: Option<T>,
}

/// 分页数据结构
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    /// 数据项列表
    pub items: Vec<T>,
    /// 总数
    pub total: u64,
    /// 每页数量
    pub limit: usize,
    /// 偏移量
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "token_expired" => 1003,
        "not_found" => 1004,
        "conflict" => 1005,
        "forbidden" => 1006,
        "already_applied" => 1101,
        "already_registered" => 1102,
        "otp_invalid" => 1103,
        "otp_expired" => 1104,
        "mail_unavailable" => 1105,
        "match_unavailable" => 1106,
        "match_failed" => 1107,
        "internal_error" => 1500,
        "storage_error" => 1501,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// 邮箱格式校验（宽松：本地部分非空，域名含点且不以点开头/结尾）
pub(crate) fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
}

/// 为档案签发会话令牌，注册 / 登录 / OTP 验证共用。
pub(crate) fn issue_session(
    state: &AppState,
    profile: &ProfileRow,
) -> anyhow::Result<AuthResponse> {
    let token = create_token(
        &state.jwt_secret,
        &profile.id,
        &profile.email,
        profile.is_ngo,
        state.token_expire_secs,
    )?;
    Ok(AuthResponse {
        access_token: token,
        expires_in: state.token_expire_secs,
        profile_id: profile.id.clone(),
        account_type: AccountType::from_is_ngo(profile.is_ngo),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// 服务版本号
    version: String,
    /// 运行时长（秒）
    uptime_secs: i64,
    /// 档案总数
    profile_count: u64,
    /// 存储状态
    storage_status: String,
}

/// 获取服务健康状态。
/// 鉴权：无需 Bearer Token。
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "服务健康状态", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let (profile_count, storage_status) =
        match state.store.count_profiles(&ProfileFilter::default()).await {
            Ok(count) => (count, "ok".to_string()),
            Err(e) => {
                tracing::error!(trace_id = %trace_id.0, error = %e, "Health probe failed to reach storage");
                (0, "degraded".to_string())
            }
        };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.uptime_secs(),
            profile_count,
            storage_status,
        },
    )
}

/// 注册账号（志愿者或机构）。
/// 邮箱唯一；角色由 account_type 决定并固化为 is_ngo 标志。
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "注册成功，返回会话令牌", body = AuthResponse),
        (status = 400, description = "参数不合法", body = ApiError),
        (status = 409, description = "邮箱已被注册", body = ApiError)
    )
)]
async fn register(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
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
    if req.password.len() < 8 {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "Password must be at least 8 characters",
        );
    }

    let full_name = req.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let ngo_name = req.ngo_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match req.account_type {
        AccountType::Volunteer if full_name.is_none() => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "full_name is required for volunteer accounts",
            );
        }
        AccountType::Ngo if ngo_name.is_none() => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "ngo_name is required for NGO accounts",
            );
        }
        _ => {}
    }

    match state.store.get_profile_by_email(&email).await {
        Ok(Some(_)) => {
            return error_response(
                StatusCode::CONFLICT,
                &trace_id,
                "conflict",
                "Email already registered",
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to check email uniqueness");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to register",
            );
        }
    }

    let password_hash = match volink_storage::auth::hash_password(&req.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Password hashing failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to register",
            );
        }
    };

    let new = NewProfile {
        email,
        password_hash: Some(password_hash),
        is_ngo: req.account_type.is_ngo(),
        full_name: full_name.map(str::to_string),
        ngo_name: ngo_name.map(str::to_string),
    };
    let profile = match state.store.create_profile(&new).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to create profile");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to register",
            );
        }
    };

    tracing::info!(
        trace_id = %trace_id.0,
        profile_id = %profile.id,
        account_type = %AccountType::from_is_ngo(profile.is_ngo),
        "Profile registered"
    );

    match issue_session(&state, &profile) {
        Ok(session) => success_response(StatusCode::CREATED, &trace_id, session),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to sign session token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to register",
            )
        }
    }
}

/// 邮箱密码登录。
/// OTP 首次登录创建的账号没有密码，引导走验证码登录。
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功，返回会话令牌", body = AuthResponse),
        (status = 401, description = "邮箱或密码错误", body = ApiError)
    )
)]
async fn login(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = req.email.trim().to_lowercase();
    let profile = match state.store.get_profile_by_email(&email).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "Invalid email or password",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load profile for login");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to log in",
            );
        }
    };

    let Some(hash) = profile.password_hash.as_deref() else {
        // Account created through OTP login; it has no password to check.
        return error_response(
            StatusCode::UNAUTHORIZED,
            &trace_id,
            "unauthorized",
            "This account signs in with an email code; use the code login",
        );
    };

    match volink_storage::auth::verify_password(&req.password, hash) {
        Ok(true) => {}
        Ok(false) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "Invalid email or password",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Password verification failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to log in",
            );
        }
    }

    match issue_session(&state, &profile) {
        Ok(session) => {
            tracing::info!(trace_id = %trace_id.0, profile_id = %profile.id, "Profile logged in");
            success_response(StatusCode::OK, &trace_id, session)
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to sign session token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Failed to log in",
            )
        }
    }
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}

pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(login))
        .merge(otp::otp_routes())
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(profiles::profile_routes())
        .merge(campaigns::campaign_routes())
        .merge(applications::application_routes())
        .merge(registrations::registration_routes())
        .merge(notifications::notification_routes())
        .merge(matching::match_routes())
}
