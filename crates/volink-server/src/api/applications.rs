// Campaign application endpoints: submit, my list, NGO review, status.
//
// Submission is volunteer-facing and pre-checks for a duplicate so the
// client can tell "already applied" apart from a storage failure. Review
// endpoints are NGO-only and scoped to the caller's own campaigns.

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
use volink_common::types::{parse_skills, ApplicationStatus};
use volink_notify::templates::{EVENT_APPLICATION_RECEIVED, EVENT_APPLICATION_STATUS};
use volink_storage::{ApplicationFilter, ApplicationRow, CampaignRow, NewApplication};

/// 申请信息
#[derive(Serialize, ToSchema)]
pub struct ApplicationResponse {
    /// 申请 ID
    pub id: String,
    /// 活动 ID
    pub campaign_id: String,
    /// 申请人档案 ID
    pub volunteer_id: String,
    /// 申请人姓名
    pub name: String,
    /// 联系邮箱
    pub email: String,
    /// 联系电话
    pub phone: Option<String>,
    /// 申请动机
    pub interest: Option<String>,
    /// 技能列表（提交时按逗号拆分）
    pub skills: Vec<String>,
    /// 相关经验
    pub experience: Option<String>,
    /// 审核状态
    pub status: ApplicationStatus,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl ApplicationResponse {
    fn from_row(row: &ApplicationRow) -> Self {
        Self {
            id: row.id.clone(),
            campaign_id: row.campaign_id.clone(),
            volunteer_id: row.volunteer_id.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            interest: row.interest.clone(),
            skills: row.skills.clone(),
            experience: row.experience.clone(),
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 我的申请条目（联表活动信息及状态提示文案）
#[derive(Serialize, ToSchema)]
pub struct MyApplicationResponse {
    /// 申请 ID
    pub id: String,
    /// 活动 ID
    pub campaign_id: String,
    /// 活动标题（活动已删除时为空）
    pub campaign_title: Option<String>,
    /// 活动分类
    pub campaign_category: Option<String>,
    /// 活动地点
    pub campaign_location: Option<String>,
    /// 审核状态
    pub status: ApplicationStatus,
    /// 状态提示文案
    pub status_message: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 待审核申请条目（NGO 审核视图）
#[derive(Serialize, ToSchema)]
pub struct ReviewApplicationResponse {
    /// 申请 ID
    pub id: String,
    /// 活动 ID
    pub campaign_id: String,
    /// 活动标题
    pub campaign_title: Option<String>,
    /// 申请人档案 ID
    pub volunteer_id: String,
    /// 申请人姓名
    pub name: String,
    /// 联系邮箱
    pub email: String,
    /// 联系电话
    pub phone: Option<String>,
    /// 申请动机
    pub interest: Option<String>,
    /// 技能列表
    pub skills: Vec<String>,
    /// 相关经验
    pub experience: Option<String>,
    /// 审核状态
    pub status: ApplicationStatus,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 提交申请请求。
/// 姓名与邮箱缺省取自当前账号档案。
#[derive(Deserialize, ToSchema)]
pub struct SubmitApplicationRequest {
    /// 申请人姓名（缺省取档案展示名）
    pub name: Option<String>,
    /// 联系邮箱（缺省取账号邮箱）
    pub email: Option<String>,
    /// 联系电话
    pub phone: Option<String>,
    /// 申请动机
    pub interest: Option<String>,
    /// 技能（逗号分隔的自由文本）
    pub skills: Option<String>,
    /// 相关经验
    pub experience: Option<String>,
}

/// 审核状态更新请求（applications 与 registrations 共用）
#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// 目标状态：pending / approved / rejected
    pub status: String,
}

/// 我的申请列表查询参数
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
    /// 活动精确匹配
    #[param(required = false, rename = "campaign_id__eq")]
    #[serde(rename = "campaign_id__eq")]
    campaign_id_eq: Option<String>,
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
        ApplicationStatus::Pending => "Your application is under review.",
        ApplicationStatus::Approved => "Congratulations! Your application has been approved.",
        ApplicationStatus::Rejected => {
            "Thank you for your interest. The campaign went with other volunteers this time."
        }
    }
}

fn status_phrase(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Approved => "has been approved",
        ApplicationStatus::Rejected => "was not selected this time",
        ApplicationStatus::Pending => "is back under review",
    }
}

/// 申请参加活动。
/// 同一志愿者对同一活动只能申请一次；重复提交返回 already_applied。
#[utoipa::path(
    post,
    path = "/v1/campaigns/{id}/applications",
    tag = "Applications",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "活动 ID")),
    request_body = SubmitApplicationRequest,
    responses(
        (status = 201, description = "申请已提交", body = ApplicationResponse),
        (status = 400, description = "参数不合法", body = ApiError),
        (status = 404, description = "活动不存在", body = ApiError),
        (status = 409, description = "已申请过该活动", body = ApiError)
    )
)]
async fn submit_application(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    Json(req): Json<SubmitApplicationRequest>,
) -> impl IntoResponse {
    let campaign = match state.store.get_campaign_by_id(&campaign_id).await {
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
                "Failed to submit application",
            );
        }
    };

    match state
        .store
        .application_exists(&campaign_id, &claims.sub)
        .await
    {
        Ok(true) => {
            return error_response(
                StatusCode::CONFLICT,
                &trace_id,
                "already_applied",
                "You have already applied to this campaign",
            );
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Duplicate check failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to submit application",
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
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load applicant profile");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to submit application",
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
    let skills = parse_skills(req.skills.as_deref().unwrap_or(""));

    let new = NewApplication {
        campaign_id: campaign_id.clone(),
        volunteer_id: claims.sub.clone(),
        name,
        email,
        phone: req.phone,
        interest: req.interest,
        skills,
        experience: req.experience,
    };
    let row = match state.store.insert_campaign_application(&new).await {
        Ok(row) => row,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to insert application");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to submit application",
            );
        }
    };

    tracing::info!(
        trace_id = %trace_id.0,
        application_id = %row.id,
        campaign_id = %campaign_id,
        volunteer_id = %claims.sub,
        "Application submitted"
    );

    // Tell the publishing NGO. All legs are best effort.
    match state.store.get_profile_by_id(&campaign.ngo_id).await {
        Ok(Some(ngo_profile)) => {
            fan_out_event(
                &state,
                &ngo_profile,
                Some(claims.sub.clone()),
                EVENT_APPLICATION_RECEIVED,
                format!("{} applied to \"{}\"", row.name, campaign.title),
                json!({
                    "campaign_id": campaign.id,
                    "application_id": row.id,
                }),
                json!({
                    "volunteer_name": row.name,
                    "campaign_title": campaign.title,
                }),
            )
            .await;
        }
        Ok(None) => {
            tracing::warn!(trace_id = %trace_id.0, ngo_id = %campaign.ngo_id, "Campaign NGO profile missing");
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load NGO profile");
        }
    }

    success_response(
        StatusCode::CREATED,
        &trace_id,
        ApplicationResponse::from_row(&row),
    )
}

/// 查询当前志愿者的全部申请（联表活动信息）。
/// 最新在前；支持按 status__eq 过滤。
#[utoipa::path(
    get,
    path = "/v1/applications/mine",
    tag = "Applications",
    security(("bearer_auth" = [])),
    params(ListMineParams),
    responses(
        (status = 200, description = "我的申请列表", body = Vec<MyApplicationResponse>),
        (status = 400, description = "状态过滤值不合法", body = ApiError)
    )
)]
async fn list_my_applications(
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
    let filter = ApplicationFilter {
        status_eq,
        campaign_id_eq: None,
    };

    let rows = match state
        .store
        .list_applications_by_volunteer(&claims.sub, &filter)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list applications");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list applications",
            );
        }
    };

    let campaigns = match campaigns_by_id(&state, rows.iter().map(|r| r.campaign_id.clone())).await
    {
        Ok(map) => map,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to join campaigns");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list applications",
            );
        }
    };

    let items: Vec<MyApplicationResponse> = rows
        .iter()
        .map(|row| {
            let campaign = campaigns.get(&row.campaign_id);
            MyApplicationResponse {
                id: row.id.clone(),
                campaign_id: row.campaign_id.clone(),
                campaign_title: campaign.map(|c| c.title.clone()),
                campaign_category: campaign.map(|c| c.category.clone()),
                campaign_location: campaign.and_then(|c| c.location.clone()),
                status: row.status,
                status_message: status_message(row.status).to_string(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect();
    success_response(StatusCode::OK, &trace_id, items)
}

/// 分页查询本机构活动收到的申请（NGO 审核视图）。
/// 仅机构账号可调用；支持按 status__eq、campaign_id__eq 过滤。
#[utoipa::path(
    get,
    path = "/v1/applications/review",
    tag = "Applications",
    security(("bearer_auth" = [])),
    params(ReviewListParams),
    responses(
        (status = 200, description = "申请分页列表", body = Vec<ReviewApplicationResponse>),
        (status = 400, description = "状态过滤值不合法", body = ApiError),
        (status = 403, description = "非机构账号", body = ApiError)
    )
)]
async fn review_applications(
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
            "Only NGO accounts can review applications",
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

    let campaign_ids = match state.store.list_campaign_ids_by_ngo(&claims.sub).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list NGO campaigns");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list applications",
            );
        }
    };
    if campaign_ids.is_empty() {
        return success_paginated_response(
            StatusCode::OK,
            &trace_id,
            Vec::<ReviewApplicationResponse>::new(),
            0,
            limit,
            offset,
        );
    }

    let filter = ApplicationFilter {
        status_eq,
        campaign_id_eq: params.campaign_id_eq.clone(),
    };
    let total = match state
        .store
        .count_applications_for_campaigns(&campaign_ids, &filter)
        .await
    {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to count applications");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list applications",
            );
        }
    };
    let rows = match state
        .store
        .list_applications_for_campaigns(&campaign_ids, &filter, limit, offset)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list applications");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list applications",
            );
        }
    };

    let campaigns = match campaigns_by_id(&state, rows.iter().map(|r| r.campaign_id.clone())).await
    {
        Ok(map) => map,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to join campaigns");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list applications",
            );
        }
    };

    let items: Vec<ReviewApplicationResponse> = rows
        .iter()
        .map(|row| ReviewApplicationResponse {
            id: row.id.clone(),
            campaign_id: row.campaign_id.clone(),
            campaign_title: campaigns.get(&row.campaign_id).map(|c| c.title.clone()),
            volunteer_id: row.volunteer_id.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            phone: row.phone.clone(),
            interest: row.interest.clone(),
            skills: row.skills.clone(),
            experience: row.experience.clone(),
            status: row.status,
            created_at: row.created_at,
        })
        .collect();
    success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
}

/// 更新申请的审核状态。
/// 仅活动所属机构可调用；任意状态间可互转（回到 pending 即重置）。
#[utoipa::path(
    put,
    path = "/v1/applications/{id}/status",
    tag = "Applications",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "申请 ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "更新后的申请", body = ApplicationResponse),
        (status = 400, description = "状态值不合法", body = ApiError),
        (status = 403, description = "非活动所属机构", body = ApiError),
        (status = 404, description = "申请不存在", body = ApiError)
    )
)]
async fn update_application_status(
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
            "Only NGO accounts can review applications",
        );
    }
    let new_status = match req.status.parse::<ApplicationStatus>() {
        Ok(status) => status,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e);
        }
    };

    let existing = match state.store.get_application_by_id(&id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Application not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load application");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update application",
            );
        }
    };
    let campaign = match state.store.get_campaign_by_id(&existing.campaign_id).await {
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
                "Failed to update application",
            );
        }
    };
    if campaign.ngo_id != claims.sub {
        return error_response(
            StatusCode::FORBIDDEN,
            &trace_id,
            "forbidden",
            "Only the publishing NGO can review this application",
        );
    }

    let updated = match state.store.update_application_status(&id, new_status).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Application not found",
            );
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to update application status");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update application",
            );
        }
    };

    tracing::info!(
        trace_id = %trace_id.0,
        application_id = %id,
        from = %existing.status,
        to = %new_status,
        action = existing.status.transition_label(new_status),
        "Application status updated"
    );

    match state.store.get_profile_by_id(&updated.volunteer_id).await {
        Ok(Some(volunteer)) => {
            fan_out_event(
                &state,
                &volunteer,
                Some(claims.sub.clone()),
                EVENT_APPLICATION_STATUS,
                format!(
                    "Your application for \"{}\" {}",
                    campaign.title,
                    status_phrase(new_status)
                ),
                json!({
                    "campaign_id": campaign.id,
                    "application_id": updated.id,
                    "status": new_status,
                }),
                json!({
                    "campaign_title": campaign.title,
                    "status": new_status,
                }),
            )
            .await;
        }
        Ok(None) => {
            tracing::warn!(trace_id = %trace_id.0, volunteer_id = %updated.volunteer_id, "Applicant profile missing");
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load applicant profile");
        }
    }

    success_response(
        StatusCode::OK,
        &trace_id,
        ApplicationResponse::from_row(&updated),
    )
}

/// Joins campaign rows by id for list views.
async fn campaigns_by_id(
    state: &AppState,
    ids: impl Iterator<Item = String>,
) -> anyhow::Result<HashMap<String, CampaignRow>> {
    let mut unique: Vec<String> = ids.collect();
    unique.sort();
    unique.dedup();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = state.store.get_campaigns_by_ids(&unique).await?;
    Ok(rows.into_iter().map(|row| (row.id.clone(), row)).collect())
}

pub fn application_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(submit_application))
        .routes(routes!(list_my_applications))
        .routes(routes!(review_applications))
        .routes(routes!(update_application_status))
}
