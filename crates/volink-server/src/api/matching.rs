// AI campaign matching endpoint.
//
// One call, no retries, no cache: the whole campaign catalog goes into a
// single chat completion and the reply maps back onto stored campaigns.
// When the engine is not configured the endpoint says so instead of
// pretending to match.

use crate::api::{error_response, success_response, ApiError};
use crate::auth::Claims;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_ai::{CampaignSummary, MatchInput};
use volink_common::types::parse_skills;
use volink_storage::CampaignFilter;

/// Catalog cap for the prompt; matching is all-or-nothing over one call.
const MATCH_CATALOG_LIMIT: usize = 10_000;

/// 匹配请求：志愿者画像（全部可选，缺省按空处理）
#[derive(Deserialize, ToSchema)]
pub struct MatchVolunteerRequest {
    /// 兴趣描述（自由文本）
    pub interests: Option<String>,
    /// 技能（逗号分隔的自由文本）
    pub skills: Option<String>,
    /// 可投入时间（自由文本）
    pub availability: Option<String>,
    /// 所在地
    pub location: Option<String>,
}

/// 单条匹配结果
#[derive(Serialize, ToSchema)]
pub struct MatchItemResponse {
    /// 活动 ID
    pub campaign_id: String,
    /// 活动标题
    pub title: String,
    /// 活动分类
    pub category: String,
    /// 活动地点
    pub location: Option<String>,
    /// 发布机构名称
    pub ngo_name: String,
    /// 匹配分（0-100）
    pub match_score: u8,
    /// 匹配理由
    pub reason: String,
    /// 匹配亮点
    pub highlights: Vec<String>,
}

/// 匹配响应
#[derive(Serialize, ToSchema)]
pub struct MatchResponse {
    /// 使用的引擎（如 openai）
    pub provider: String,
    /// 使用的模型
    pub model: String,
    /// 最多 5 条，按匹配度从高到低
    pub matches: Vec<MatchItemResponse>,
}

/// 为当前志愿者推荐活动。
/// 需要在配置中启用 AI 匹配；失败时整体报错，不降级。
#[utoipa::path(
    post,
    path = "/v1/match/volunteer",
    tag = "Matching",
    security(("bearer_auth" = [])),
    request_body = MatchVolunteerRequest,
    responses(
        (status = 200, description = "匹配结果", body = MatchResponse),
        (status = 502, description = "匹配调用失败", body = ApiError),
        (status = 503, description = "未配置匹配引擎", body = ApiError)
    )
)]
async fn match_volunteer(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<MatchVolunteerRequest>,
) -> impl IntoResponse {
    let Some(engine) = state.matcher.clone() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &trace_id,
            "match_unavailable",
            "AI matching is not configured",
        );
    };

    let campaigns = match state
        .store
        .list_campaigns_with_ngo_names(&CampaignFilter::default(), MATCH_CATALOG_LIMIT, 0)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to load campaign catalog");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to match",
            );
        }
    };

    let provider = engine.provider().to_string();
    let model = engine.model_name().to_string();

    // Nothing to rank; skip the engine call entirely.
    if campaigns.is_empty() {
        return success_response(
            StatusCode::OK,
            &trace_id,
            MatchResponse {
                provider,
                model,
                matches: Vec::new(),
            },
        );
    }

    let input = MatchInput {
        interests: req.interests.unwrap_or_default(),
        skills: parse_skills(req.skills.as_deref().unwrap_or("")),
        availability: req.availability.unwrap_or_default(),
        location: req.location.unwrap_or_default(),
        campaigns: campaigns
            .iter()
            .map(|(row, ngo_name)| CampaignSummary {
                id: row.id.clone(),
                title: row.title.clone(),
                category: row.category.clone(),
                location: row.location.clone(),
                description: row.description.clone(),
                ngo_name: ngo_name
                    .clone()
                    .unwrap_or_else(|| "Unknown organization".to_string()),
            })
            .collect(),
    };

    match engine.match_volunteer(input).await {
        Ok(matches) => {
            tracing::info!(
                trace_id = %trace_id.0,
                volunteer_id = %claims.sub,
                match_count = matches.len(),
                "Volunteer matching completed"
            );
            let items: Vec<MatchItemResponse> = matches
                .into_iter()
                .map(|m| MatchItemResponse {
                    campaign_id: m.campaign.id,
                    title: m.campaign.title,
                    category: m.campaign.category,
                    location: m.campaign.location,
                    ngo_name: m.campaign.ngo_name,
                    match_score: m.match_score,
                    reason: m.reason,
                    highlights: m.highlights,
                })
                .collect();
            success_response(
                StatusCode::OK,
                &trace_id,
                MatchResponse {
                    provider,
                    model,
                    matches: items,
                },
            )
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Volunteer matching failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                &trace_id,
                "match_failed",
                "Matching failed, try again later",
            )
        }
    }
}

pub fn match_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(match_volunteer))
}
