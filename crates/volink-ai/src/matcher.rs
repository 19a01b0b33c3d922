use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// 匹配输入：志愿者画像 + 当前开放的活动清单
#[derive(Debug, Clone, Serialize)]
pub struct MatchInput {
    /// 兴趣方向（自由文本）
    pub interests: String,
    /// 技能列表（已按逗号拆分）
    pub skills: Vec<String>,
    /// 可投入时间（自由文本）
    pub availability: String,
    /// 所在地
    pub location: String,
    /// 候选活动（调用方预先补齐机构名）
    pub campaigns: Vec<CampaignSummary>,
}

/// 供模型挑选的活动摘要
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub location: Option<String>,
    pub description: Option<String>,
    /// 发布机构名称
    pub ngo_name: String,
}

/// 单条推荐结果
#[derive(Debug, Clone, Serialize)]
pub struct CampaignMatch {
    /// 被推荐的活动
    pub campaign: CampaignSummary,
    /// 匹配度（0-100）
    pub match_score: u8,
    /// 推荐理由
    pub reason: String,
    /// 匹配亮点（2-3 条短语）
    pub highlights: Vec<String>,
}

/// 匹配引擎 trait（支持多模型扩展）
#[async_trait]
pub trait MatchEngine: Send + Sync {
    /// 模型提供商名称
    fn provider(&self) -> &str;

    /// 模型名称
    fn model_name(&self) -> &str;

    /// 为一位志愿者挑选最合适的活动，按匹配度排序返回
    async fn match_volunteer(&self, input: MatchInput) -> Result<Vec<CampaignMatch>>;
}
