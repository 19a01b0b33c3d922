// Campaign endpoints: browse, publish, edit.
//
// Listing joins the publishing NGO's display name so cards render without
// a second round trip. Mutations are NGO-only; edits are owner-only.

use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response, ApiError};
use crate::auth::Claims;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_storage::{CampaignFilter, CampaignRow, CampaignUpdate, NewCampaign};

/// 活动信息
#[derive(Serialize, ToSchema)]
pub struct CampaignResponse {
    /// 活动 ID
    pub id: String,
    /// 发布机构的档案 ID
    pub ngo_id: String,
    /// 发布机构名称
    pub ngo_name: Option<String>,
    /// 标题
    pub title: String,
    /// 描述
    pub description: Option<String>,
    /// 地点
    pub location: Option<String>,
    /// 活动日期（自由文本）
    pub date: Option<String>,
    /// 活动目标
    pub goal: Option<String>,
    /// 分类
    pub category: String,
    /// 封面图 URL
    pub image_url: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl CampaignResponse {
    pub(crate) fn from_row(row: &CampaignRow, ngo_name: Option<String>) -> Self {
        Self {
            id: row.id.clone(),
            ngo_id: row.ngo_id.clone(),
            ngo_name,
            title: row.title.clone(),
            description: row.description.clone(),
            location: row.location.clone(),
            date: row.date.clone(),
            goal: row.goal.clone(),
            category: row.category.clone(),
            image_url: row.image_url.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 新建活动请求
#[derive(Deserialize, ToSchema)]
pub struct CreateCampaignRequest {
    /// 标题（必填）
    pub title: String,
    /// 描述
    pub description: Option<String>,
    /// 地点
    pub location: Option<String>,
    /// 活动日期（自由文本）
    pub date: Option<String>,
    /// 活动目标
    pub goal: Option<String>,
    /// 分类（缺省为 Community）
    pub category: Option<String>,
    /// 封面图 URL
    pub image_url: Option<String>,
}

/// 活动更新请求（仅覆盖提供的字段）
#[derive(Deserialize, ToSchema)]
pub struct UpdateCampaignRequest {
    /// 标题
    pub title: Option<String>,
    /// 描述
    pub description: Option<String>,
    /// 地点
    pub location: Option<String>,
    /// 活动日期（自由文本）
    pub date: Option<String>,
    /// 活动目标
    pub goal: Option<String>,
    /// 分类
    pub category: Option<String>,
    /// 封面图 URL
    pub image_url: Option<String>,
}

/// 活动列表查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListCampaignsParams {
    /// 分类精确匹配
    #[param(required = false, rename = "category__eq")]
    #[serde(rename = "category__eq")]
    category_eq: Option<String>,
    /// 发布机构精确匹配
    #[param(required = false, rename = "ngo_id__eq")]
    #[serde(rename = "ngo_id__eq")]
    ngo_id_eq: Option<String>,
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

/// 分页查询活动列表（支持按 category__eq、ngo_id__eq 过滤）。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/campaigns",
    tag = "Campaigns",
    security(("bearer_auth" = [])),
    params(ListCampaignsParams),
    responses(
        (status = 200, description = "活动分页列表", body = Vec<CampaignResponse>),
        (status = 401, description = "未认证", body = ApiError)
    )
)]
async fn list_campaigns(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListCampaignsParams>,
) -> impl IntoResponse {
    let limit = PaginationParams::resolve_limit(params.limit);
    let offset = PaginationParams::resolve_offset(params.offset);
    let filter = CampaignFilter {
        category_eq: params.category_eq.clone(),
        ngo_id_eq: params.ngo_id_eq.clone(),
    };

    let total = match state.store.count_campaigns(&filter).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to count campaigns");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list campaigns",
            );
        }
    };

    match state
        .store
        .list_campaigns_with_ngo_names(&filter, limit, offset)
        .await
    {
        Ok(rows) => {
            let items: Vec<CampaignResponse> = rows
                .iter()
                .map(|(row, ngo_name)| CampaignResponse::from_row(row, ngo_name.clone()))
                .collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list campaigns");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list campaigns",
            )
        }
    }
}

/// 发布新活动。
/// 仅机构账号可调用；发布者固定为当前账号。
#[utoipa::path(
    post,
    path = "/v1/campaigns",
    tag = "Campaigns",
    security(("bearer_auth" = [])),
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "创建成功", body = CampaignResponse),
        (status = 400, description = "参数不合法", body = ApiError),
        (status = 403, description = "非机构账号", body = ApiError)
    )
)]
async fn create_campaign(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> impl IntoResponse {
    if !claims.is_ngo {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only NGO accounts can publish campaigns",
        );
    }
    let title = req.title.trim();
    if title.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "title is required",
        );
    }

    let ngo_name = match state.store.get_profile_by_id(&claims.sub).await {
        Ok(Some(profile)) => Some(profile.display_name().to_string()),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load publisher profile");
            None
        }
    };

    let new = NewCampaign {
        ngo_id: claims.sub.clone(),
        title: title.to_string(),
        description: req.description,
        location: req.location,
        date: req.date,
        goal: req.goal,
        category: req.category,
        image_url: req.image_url,
    };
    match state.store.insert_campaign(&new).await {
        Ok(row) => {
            tracing::info!(
                trace_id = %trace_id.0,
                campaign_id = %row.id,
                ngo_id = %row.ngo_id,
                "Campaign published"
            );
            success_response(
                StatusCode::CREATED,
                &trace_id,
                CampaignResponse::from_row(&row, ngo_name),
            )
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to insert campaign");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to publish campaign",
            )
        }
    }
}

/// 获取单个活动详情。
#[utoipa::path(
    get,
    path = "/v1/campaigns/{id}",
    tag = "Campaigns",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "活动 ID")),
    responses(
        (status = 200, description = "活动详情", body = CampaignResponse),
        (status = 404, description = "活动不存在", body = ApiError)
    )
)]
async fn get_campaign(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let row = match state.store.get_campaign_by_id(&id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Campaign not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load campaign");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to load campaign",
            );
        }
    };
    let ngo_name = match state.store.get_profile_by_id(&row.ngo_id).await {
        Ok(Some(profile)) => Some(profile.display_name().to_string()),
        _ => None,
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        CampaignResponse::from_row(&row, ngo_name),
    )
}

/// 更新活动。
/// 仅发布该活动的机构可调用；仅覆盖请求中出现的字段。
#[utoipa::path(
    put,
    path = "/v1/campaigns/{id}",
    tag = "Campaigns",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "活动 ID")),
    request_body = UpdateCampaignRequest,
    responses(
        (status = 200, description = "更新后的活动", body = CampaignResponse),
        (status = 400, description = "参数不合法", body = ApiError),
        (status = 403, description = "非发布机构", body = ApiError),
        (status = 404, description = "活动不存在", body = ApiError)
    )
)]
async fn update_campaign(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> impl IntoResponse {
    if !claims.is_ngo {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only NGO accounts can edit campaigns",
        );
    }
    if let Some(title) = req.title.as_deref() {
        if title.trim().is_empty() {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "title cannot be blank",
            );
        }
    }

    let existing = match state.store.get_campaign_by_id(&id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Campaign not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load campaign");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update campaign",
            );
        }
    };
    if existing.ngo_id != claims.sub {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only the publishing NGO can edit this campaign",
        );
    }

    let update = CampaignUpdate {
        title: req.title,
        description: req.description,
        location: req.location,
        date: req.date,
        goal: req.goal,
        category: req.category,
        image_url: req.image_url,
    };
    match state.store.update_campaign(&id, &update).await {
        Ok(Some(row)) => {
            let ngo_name = match state.store.get_profile_by_id(&row.ngo_id).await {
                Ok(Some(profile)) => Some(profile.display_name().to_string()),
                _ => None,
            };
            success_response(
                StatusCode::OK,
                &trace_id,
                CampaignResponse::from_row(&row, ngo_name),
            )
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Campaign not found",
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to update campaign");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update campaign",
            )
        }
    }
}

pub fn campaign_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_campaigns, create_campaign))
        .routes(routes!(get_campaign, update_campaign))
}
