// Volunteer registration endpoints: register with an NGO directly, my
// list, NGO review, status. Mirrors the application flow but is scoped to
// an organization instead of a single campaign.

use crate::api::applications::UpdateStatusRequest;
use crate::api::notifications::fan_out_event;
use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, is_valid_email, success_paginated_response, success_response, ApiError,
};
use crate::auth::Claims;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_common::types::ApplicationStatus;
use volink_notify::templates::{EVENT_REGISTRATION_RECEIVED, EVENT_REGISTRATION_STATUS};
use volink_storage::{NewRegistration, RegistrationFilter, RegistrationRow};

/// 志愿者注册信息
#[derive(Serialize, ToSchema)]
pub struct RegistrationResponse {
    /// 注册 ID
    pub id: String,
    /// 志愿者档案 ID
    pub volunteer_id: String,
    /// 机构档案 ID
    pub ngo_id: String,
    /// 志愿者姓名
    pub name: String,
    /// 联系邮箱
    pub email: String,
    /// 联系电话
    pub phone: Option<String>,
    /// 意向说明
    pub interest: Option<String>,
    /// 可投入时间（自由文本）
    pub availability: Option<String>,
    /// 审核状态
    pub status: ApplicationStatus,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl RegistrationResponse {
    fn from_row(row: &RegistrationRow) -> Self {
        Self {
            id: row.id.clone(),
            volunteer_id: row.volunteer_id.clone(),
            ngo_id: row.ngo_id.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            interest: row.interest.clone(),
            availability: row.availability.clone(),
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 我的注册条目（联表机构名称及状态提示文案）
#[derive(Serialize, ToSchema)]
pub struct MyRegistrationResponse {
    /// 注册 ID
    pub id: String,
    /// 机构档案 ID
    pub ngo_id: String,
    /// 机构名称（机构已注销时为空）
    pub ngo_name: Option<String>,
    /// 审核状态
    pub status: ApplicationStatus,
    /// 状态提示文案
    pub status_message: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 待审核注册条目（NGO 审核视图）
#[derive(Serialize, ToSchema)]
pub struct ReviewRegistrationResponse {
    /// 注册 ID
    pub id: String,
    /// 志愿者档案 ID
    pub volunteer_id: String,
    /// 志愿者姓名
    pub name: String,
    /// 联系邮箱
    pub email: String,
    /// 联系电话
    pub phone: Option<String>,
    /// 意向说明
    pub interest: Option<String>,
    /// 可投入时间
    pub availability: Option<String>,
    /// 审核状态
    pub status: ApplicationStatus,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 注册成为机构志愿者请求。
/// 姓名与邮箱缺省取自当前账号档案。
#[derive(Deserialize, ToSchema)]
pub struct RegisterWithNgoRequest {
    /// 志愿者姓名（缺省取档案展示名）
    pub name: Option<String>,
    /// 联系邮箱（缺省取账号邮箱）
    pub email: Option<String>,
    /// 联系电话
    pub phone: Option<String>,
    /// 意向说明
    pub interest: Option<String>,
    /// 可投入时间（自由文本，如 weekends）
    pub availability: Option<String>,
}

/// 我的注册列表查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListMineParams {
    /// 审核状态精确匹配（pending / approved / rejected）
    #[param(required = false, rename = "status__eq")]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
}

/// 审核列表查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ReviewListParams {
    /// 审核状态精确匹配（pending / approved / rejected）
    #[param(required = false, rename = "status__eq")]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// 每页条数（默认 20）
    #[param(required = false)]
    #[serde(
        default,
        deserialize_with = "crate::api::pagination::deserialize_optional_u64"
    )]
    limit: Option<u64>,
    /// 偏移量（默认 0）
    #[param(required = false)]
    #[serde(
        default,
        deserialize_with = "crate::api::pagination::deserialize_optional_u64"
    )]
    offset: Option<u64>,
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<ApplicationStatus>, String> {
    match raw {
        None => Ok(None),
        Some(s) => s.parse::<ApplicationStatus>().map(Some),
    }
}

/// 志愿者视角的状态提示文案
fn status_message(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Pending => "Your registration is under review.",
        ApplicationStatus::Approved => "Welcome aboard! Your registration has been approved.",
        ApplicationStatus::Rejected => {
            "Thank you for your interest. The organization can't take more volunteers right now."
        }
    }
}

fn status_phrase(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Approved => "has been approved",
        ApplicationStatus::Rejected => "was not accepted this time",
        ApplicationStatus::Pending => "is back under review",
    }
}

/// 注册成为机构的志愿者。
/// 同一志愿者对同一机构只能注册一次；重复提交返回 already_registered。
#[utoipa::path(
    post,
    path = "/v1/ngos/{id}/registrations",
    tag = "Registrations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "机构档案 ID")),
    request_body = RegisterWithNgoRequest,
    responses(
        (status = 201, description = "注册已提交", body = RegistrationResponse),
        (status = 400, description = "参数不合法", body = ApiError),
        (status = 404, description = "机构不存在", body = ApiError),
        (status = 409, description = "已注册过该机构", body = ApiError)
    )
)]
async fn register_with_ngo(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(ngo_id): Path<String>,
    Json(req): Json<RegisterWithNgoRequest>,
) -> impl IntoResponse {
    let ngo_profile = match state.store.get_profile_by_id(&ngo_id).await {
        Ok(Some(profile)) if profile.is_ngo => profile,
        Ok(_) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "NGO not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load NGO profile");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to register",
            );
        }
    };

    match state.store.registration_exists(&ngo_id, &claims.sub).await {
        Ok(true) => {
            return error_response(
                StatusCode::CONFLICT,
                &trace_id,
                "already_registered",
                "You have already registered with this organization",
            );
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Duplicate check failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to register",
            );
        }
    }

    let profile = match state.store.get_profile_by_id(&claims.sub).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Profile not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load volunteer profile");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to register",
            );
        }
    };

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| profile.display_name())
        .to_string();
    let email = match req.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(provided) => {
            let provided = provided.to_lowercase();
            if !is_valid_email(&provided) {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    "A valid contact email is required",
                );
            }
            provided
        }
        None => profile.email.clone(),
    };

    let new = NewRegistration {
        volunteer_id: claims.sub.clone(),
        ngo_id: ngo_id.clone(),
        name,
        email,
        phone: req.phone,
        interest: req.interest,
        availability: req.availability,
    };
    let row = match state.store.insert_volunteer_registration(&new).await {
        Ok(row) => row,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to insert registration");
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
        registration_id = %row.id,
        ngo_id = %ngo_id,
        volunteer_id = %claims.sub,
        "Volunteer registration submitted"
    );

    let ngo_name = ngo_profile.display_name().to_string();
    fan_out_event(
        &state,
        &ngo_profile,
        Some(claims.sub.clone()),
        EVENT_REGISTRATION_RECEIVED,
        format!("{} registered to volunteer with {}", row.name, ngo_name),
        json!({
            "registration_id": row.id,
        }),
        json!({
            "volunteer_name": row.name,
            "ngo_name": ngo_name,
        }),
    )
    .await;

    success_response(
        StatusCode::CREATED,
        &trace_id,
        RegistrationResponse::from_row(&row),
    )
}

/// 查询当前志愿者的全部机构注册（联表机构名称）。
/// 最新在前；支持按 status__eq 过滤。
#[utoipa::path(
    get,
    path = "/v1/registrations/mine",
    tag = "Registrations",
    security(("bearer_auth" = [])),
    params(ListMineParams),
    responses(
        (status = 200, description = "我的注册列表", body = Vec<MyRegistrationResponse>),
        (status = 400, description = "状态过滤值不合法", body = ApiError)
    )
)]
async fn list_my_registrations(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(params): Query<ListMineParams>,
) -> impl IntoResponse {
    let status_eq = match parse_status_filter(params.status_eq.as_deref()) {
        Ok(status) => status,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e);
        }
    };
    let filter = RegistrationFilter { status_eq };

    let rows = match state
        .store
        .list_registrations_by_volunteer(&claims.sub, &filter)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list registrations");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list registrations",
            );
        }
    };

    let mut ngo_ids: Vec<String> = rows.iter().map(|r| r.ngo_id.clone()).collect();
    ngo_ids.sort();
    ngo_ids.dedup();
    let ngo_names: HashMap<String, String> = if ngo_ids.is_empty() {
        HashMap::new()
    } else {
        match state.store.get_profiles_by_ids(&ngo_ids).await {
            Ok(profiles) => profiles
                .iter()
                .map(|p| (p.id.clone(), p.display_name().to_string()))
                .collect(),
            Err(e) => {
                tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to join NGO names");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &trace_id,
                    "storage_error",
                    "Failed to list registrations",
                );
            }
        }
    };

    let items: Vec<MyRegistrationResponse> = rows
        .iter()
        .map(|row| MyRegistrationResponse {
            id: row.id.clone(),
            ngo_id: row.ngo_id.clone(),
            ngo_name: ngo_names.get(&row.ngo_id).cloned(),
            status: row.status,
            status_message: status_message(row.status).to_string(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect();
    success_response(StatusCode::OK, &trace_id, items)
}

/// 分页查询本机构收到的志愿者注册（NGO 审核视图）。
/// 仅机构账号可调用；支持按 status__eq 过滤。
#[utoipa::path(
    get,
    path = "/v1/registrations/review",
    tag = "Registrations",
    security(("bearer_auth" = [])),
    params(ReviewListParams),
    responses(
        (status = 200, description = "注册分页列表", body = Vec<ReviewRegistrationResponse>),
        (status = 400, description = "状态过滤值不合法", body = ApiError),
        (status = 403, description = "非机构账号", body = ApiError)
    )
)]
async fn review_registrations(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(params): Query<ReviewListParams>,
) -> impl IntoResponse {
    if !claims.is_ngo {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only NGO accounts can review registrations",
        );
    }
    let status_eq = match parse_status_filter(params.status_eq.as_deref()) {
        Ok(status) => status,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e);
        }
    };
    let limit = PaginationParams::resolve_limit(params.limit);
    let offset = PaginationParams::resolve_offset(params.offset);
    let filter = RegistrationFilter { status_eq };

    let total = match state
        .store
        .count_registrations_for_ngo(&claims.sub, &filter)
        .await
    {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to count registrations");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list registrations",
            );
        }
    };
    match state
        .store
        .list_registrations_for_ngo(&claims.sub, &filter, limit, offset)
        .await
    {
        Ok(rows) => {
            let items: Vec<ReviewRegistrationResponse> = rows
                .iter()
                .map(|row| ReviewRegistrationResponse {
                    id: row.id.clone(),
                    volunteer_id: row.volunteer_id.clone(),
                    name: row.name.clone(),
                    email: row.email.clone(),
                    phone: row.phone.clone(),
                    interest: row.interest.clone(),
                    availability: row.availability.clone(),
                    status: row.status,
                    created_at: row.created_at,
                })
                .collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list registrations");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list registrations",
            )
        }
    }
}

/// 更新志愿者注册的审核状态。
/// 仅被注册的机构可调用；任意状态间可互转（回到 pending 即重置）。
#[utoipa::path(
    put,
    path = "/v1/registrations/{id}/status",
    tag = "Registrations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "注册 ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "更新后的注册", body = RegistrationResponse),
        (status = 400, description = "状态值不合法", body = ApiError),
        (status = 403, description = "非被注册机构", body = ApiError),
        (status = 404, description = "注册不存在", body = ApiError)
    )
)]
async fn update_registration_status(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    if !claims.is_ngo {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only NGO accounts can review registrations",
        );
    }
    let new_status = match req.status.parse::<ApplicationStatus>() {
        Ok(status) => status,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e);
        }
    };

    let existing = match state.store.get_registration_by_id(&id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Registration not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load registration");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update registration",
            );
        }
    };
    if existing.ngo_id != claims.sub {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only the registered NGO can review this registration",
        );
    }

    let updated = match state.store.update_registration_status(&id, new_status).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Registration not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to update registration status");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update registration",
            );
        }
    };

    tracing::info!(
        trace_id = %trace_id.0,
        registration_id = %id,
        from = %existing.status,
        to = %new_status,
        action = existing.status.transition_label(new_status),
        "Registration status updated"
    );

    let ngo_name = match state.store.get_profile_by_id(&claims.sub).await {
        Ok(Some(profile)) => profile.display_name().to_string(),
        _ => claims.email.clone(),
    };
    match state.store.get_profile_by_id(&updated.volunteer_id).await {
        Ok(Some(volunteer)) => {
            fan_out_event(
                &state,
                &volunteer,
                Some(claims.sub.clone()),
                EVENT_REGISTRATION_STATUS,
                format!(
                    "Your volunteer registration with {} {}",
                    ngo_name,
                    status_phrase(new_status)
                ),
                json!({
                    "registration_id": updated.id,
                    "status": new_status,
                }),
                json!({
                    "ngo_name": ngo_name,
                    "status": new_status,
                }),
            )
            .await;
        }
        Ok(None) => {
            tracing::warn!(trace_id = %trace_id.0, volunteer_id = %updated.volunteer_id, "Volunteer profile missing");
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load volunteer profile");
        }
    }

    success_response(
        StatusCode::OK,
        &trace_id,
        RegistrationResponse::from_row(&updated),
    )
}

pub fn registration_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(register_with_ngo))
        .routes(routes!(list_my_registrations))
        .routes(routes!(review_registrations))
        .routes(routes!(update_registration_status))
}
