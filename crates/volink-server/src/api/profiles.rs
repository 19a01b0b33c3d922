// Profile endpoints: the caller's own profile plus the NGO directory.

use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response, ApiError};
use crate::auth::Claims;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_common::types::AccountType;
use volink_storage::{ProfileFilter, ProfileRow, ProfileUpdate};

/// 档案信息
#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    /// 档案 ID
    pub id: String,
    /// 邮箱
    pub email: String,
    /// 派生角色：volunteer 或 ngo
    pub account_type: AccountType,
    /// 展示名称（机构取 ngo_name，志愿者取 full_name，缺省回退邮箱）
    pub display_name: String,
    /// 志愿者姓名
    pub full_name: Option<String>,
    /// 机构名称
    pub ngo_name: Option<String>,
    /// 机构简介
    pub ngo_description: Option<String>,
    /// 机构网站
    pub ngo_website: Option<String>,
    /// 头像 URL
    pub avatar_url: Option<String>,
    /// 个人简介
    pub bio: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl ProfileResponse {
    fn from_row(row: &ProfileRow) -> Self {
        Self {
            id: row.id.clone(),
            email: row.email.clone(),
            account_type: AccountType::from_is_ngo(row.is_ngo),
            display_name: row.display_name().to_string(),
            full_name: row.full_name.clone(),
            ngo_name: row.ngo_name.clone(),
            ngo_description: row.ngo_description.clone(),
            ngo_website: row.ngo_website.clone(),
            avatar_url: row.avatar_url.clone(),
            bio: row.bio.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 档案更新请求（仅覆盖提供的字段）
#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    /// 志愿者姓名
    pub full_name: Option<String>,
    /// 机构名称
    pub ngo_name: Option<String>,
    /// 机构简介
    pub ngo_description: Option<String>,
    /// 机构网站
    pub ngo_website: Option<String>,
    /// 头像 URL
    pub avatar_url: Option<String>,
    /// 个人简介
    pub bio: Option<String>,
}

/// 机构目录条目
#[derive(Serialize, ToSchema)]
pub struct NgoResponse {
    /// 档案 ID
    pub id: String,
    /// 机构名称
    pub ngo_name: String,
    /// 机构简介
    pub ngo_description: Option<String>,
    /// 机构网站
    pub ngo_website: Option<String>,
    /// 头像 URL
    pub avatar_url: Option<String>,
    /// 联系邮箱
    pub email: String,
}

impl NgoResponse {
    fn from_row(row: &ProfileRow) -> Self {
        Self {
            id: row.id.clone(),
            ngo_name: row.display_name().to_string(),
            ngo_description: row.ngo_description.clone(),
            ngo_website: row.ngo_website.clone(),
            avatar_url: row.avatar_url.clone(),
            email: row.email.clone(),
        }
    }
}

/// 获取当前登录账号的档案。
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Profiles",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "当前档案", body = ProfileResponse),
        (status = 401, description = "未认证", body = ApiError),
        (status = 404, description = "档案不存在", body = ApiError)
    )
)]
async fn get_me(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.get_profile_by_id(&claims.sub).await {
        Ok(Some(profile)) => {
            success_response(StatusCode::OK, &trace_id, ProfileResponse::from_row(&profile))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Profile not found",
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load profile");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to load profile",
            )
        }
    }
}

/// 更新当前登录账号的档案。
/// 仅覆盖请求中出现的字段；邮箱与角色不可更改。
#[utoipa::path(
    put,
    path = "/v1/me",
    tag = "Profiles",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "更新后的档案", body = ProfileResponse),
        (status = 401, description = "未认证", body = ApiError),
        (status = 404, description = "档案不存在", body = ApiError)
    )
)]
async fn update_me(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let update = ProfileUpdate {
        full_name: req.full_name,
        ngo_name: req.ngo_name,
        ngo_description: req.ngo_description,
        ngo_website: req.ngo_website,
        avatar_url: req.avatar_url,
        bio: req.bio,
    };
    match state.store.update_profile(&claims.sub, &update).await {
        Ok(Some(profile)) => {
            success_response(StatusCode::OK, &trace_id, ProfileResponse::from_row(&profile))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Profile not found",
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to update profile");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update profile",
            )
        }
    }
}

/// 分页查询机构目录。
/// 默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/ngos",
    tag = "Profiles",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "机构分页列表", body = Vec<NgoResponse>),
        (status = 401, description = "未认证", body = ApiError)
    )
)]
async fn list_ngos(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let filter = ProfileFilter {
        is_ngo_eq: Some(true),
    };
    let total = match state.store.count_profiles(&filter).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to count NGOs");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list NGOs",
            );
        }
    };
    match state
        .store
        .list_profiles(&filter, params.limit(), params.offset())
        .await
    {
        Ok(rows) => {
            let items: Vec<NgoResponse> = rows.iter().map(NgoResponse::from_row).collect();
            success_paginated_response(
                StatusCode::OK,
                &trace_id,
                items,
                total,
                params.limit(),
                params.offset(),
            )
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list NGOs");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list NGOs",
            )
        }
    }
}

pub fn profile_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(get_me, update_me))
        .routes(routes!(list_ngos))
}
