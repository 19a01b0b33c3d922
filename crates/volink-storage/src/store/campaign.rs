use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::campaign::{self, Column, Entity};
use crate::store::HubStore;

/// 活动数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRow {
    pub id: String,
    /// 发布机构的档案 ID
    pub ngo_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// 活动日期（展示用自由文本）
    pub date: Option<String>,
    pub goal: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建活动参数
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub ngo_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub goal: Option<String>,
    /// 缺省为 "Community"（快捷创建路径）
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// 活动更新请求（仅覆盖提供的字段，仅限所属机构）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub goal: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// 活动过滤条件
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub category_eq: Option<String>,
    pub ngo_id_eq: Option<String>,
}

pub(crate) fn model_to_campaign(m: campaign::Model) -> CampaignRow {
    CampaignRow {
        id: m.id,
        ngo_id: m.ngo_id,
        title: m.title,
        description: m.description,
        location: m.location,
        date: m.date,
        goal: m.goal,
        category: m.category,
        image_url: m.image_url,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn apply_campaign_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &CampaignFilter,
) -> sea_orm::Select<Entity> {
    if let Some(ref cat) = filter.category_eq {
        q = q.filter(Column::Category.eq(cat.as_str()));
    }
    if let Some(ref ngo) = filter.ngo_id_eq {
        q = q.filter(Column::NgoId.eq(ngo.as_str()));
    }
    q
}

impl HubStore {
    pub async fn insert_campaign(&self, new: &NewCampaign) -> Result<CampaignRow> {
        let id = volink_common::id::next_id();
        let now = Utc::now().fixed_offset();
        let category = new
            .category
            .clone()
            .unwrap_or_else(|| "Community".to_string());
        let am = campaign::ActiveModel {
            id: Set(id),
            ngo_id: Set(new.ngo_id.clone()),
            title: Set(new.title.clone()),
            description: Set(new.description.clone()),
            location: Set(new.location.clone()),
            date: Set(new.date.clone()),
            goal: Set(new.goal.clone()),
            category: Set(category),
            image_url: Set(new.image_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_campaign(model))
    }

    pub async fn get_campaign_by_id(&self, id: &str) -> Result<Option<CampaignRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(model_to_campaign))
    }

    /// 批量按 ID 取活动（用于申请列表的标题回填）
    pub async fn get_campaigns_by_ids(&self, ids: &[String]) -> Result<Vec<CampaignRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Entity::find()
            .filter(Column::Id.is_in(ids.iter().cloned()))
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_campaign).collect())
    }

    /// 最新优先的活动列表
    pub async fn list_campaigns(
        &self,
        filter: &CampaignFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CampaignRow>> {
        let q = apply_campaign_filter(Entity::find(), filter);
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_campaign).collect())
    }

    pub async fn count_campaigns(&self, filter: &CampaignFilter) -> Result<u64> {
        let q = apply_campaign_filter(Entity::find(), filter);
        Ok(q.count(self.db()).await?)
    }

    /// 机构名下全部活动 ID（审核列表的范围界定）
    pub async fn list_campaign_ids_by_ngo(&self, ngo_id: &str) -> Result<Vec<String>> {
        let rows = Entity::find()
            .filter(Column::NgoId.eq(ngo_id))
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(|m| m.id).collect())
    }

    pub async fn update_campaign(
        &self,
        id: &str,
        upd: &CampaignUpdate,
    ) -> Result<Option<CampaignRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: campaign::ActiveModel = m.into();
            if let Some(ref v) = upd.title {
                am.title = Set(v.clone());
            }
            if let Some(ref v) = upd.description {
                am.description = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.location {
                am.location = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.date {
                am.date = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.goal {
                am.goal = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.category {
                am.category = Set(v.clone());
            }
            if let Some(ref v) = upd.image_url {
                am.image_url = Set(Some(v.clone()));
            }
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(model_to_campaign(updated)))
        } else {
            Ok(None)
        }
    }

    /// 活动列表联同发布机构展示名称。
    ///
    /// 机构名称通过一次批量 `IN` 查询回填，不做 SQL JOIN；
    /// 档案已被删除（理论上不会发生）时名称为 None。
    pub async fn list_campaigns_with_ngo_names(
        &self,
        filter: &CampaignFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<(CampaignRow, Option<String>)>> {
        let campaigns = self.list_campaigns(filter, limit, offset).await?;
        let names = self.ngo_names_for(&campaigns).await?;
        Ok(campaigns
            .into_iter()
            .map(|c| {
                let name = names.get(&c.ngo_id).cloned();
                (c, name)
            })
            .collect())
    }

    pub(crate) async fn ngo_names_for(
        &self,
        campaigns: &[CampaignRow],
    ) -> Result<HashMap<String, String>> {
        let mut ids: Vec<String> = campaigns.iter().map(|c| c.ngo_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let profiles = self.get_profiles_by_ids(&ids).await?;
        Ok(profiles
            .into_iter()
            .map(|p| {
                let name = p.display_name().to_string();
                (p.id, name)
            })
            .collect())
    }
}
