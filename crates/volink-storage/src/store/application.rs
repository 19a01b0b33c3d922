use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use volink_common::types::ApplicationStatus;

use crate::entities::campaign_application::{self, Column, Entity};
use crate::store::HubStore;

/// 活动报名申请数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub id: String,
    pub campaign_id: String,
    pub volunteer_id: String,
    /// 申请人填写的姓名
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// 申请动机（自由文本）
    pub interest: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建申请参数（状态固定从 pending 开始）
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub campaign_id: String,
    pub volunteer_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
}

/// 申请过滤条件
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status_eq: Option<ApplicationStatus>,
    pub campaign_id_eq: Option<String>,
}

fn model_to_application(m: campaign_application::Model) -> Result<ApplicationRow> {
    let status = m
        .status
        .parse::<ApplicationStatus>()
        .map_err(|e| anyhow::anyhow!("application {}: {e}", m.id))?;
    let skills: Vec<String> = serde_json::from_str(&m.skills)
        .map_err(|e| anyhow::anyhow!("application {}: bad skills payload: {e}", m.id))?;
    Ok(ApplicationRow {
        id: m.id,
        campaign_id: m.campaign_id,
        volunteer_id: m.volunteer_id,
        name: m.name,
        email: m.email,
        phone: m.phone,
        interest: m.interest,
        skills,
        experience: m.experience,
        status,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn apply_application_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &ApplicationFilter,
) -> sea_orm::Select<Entity> {
    if let Some(status) = filter.status_eq {
        q = q.filter(Column::Status.eq(status.to_string()));
    }
    if let Some(ref cid) = filter.campaign_id_eq {
        q = q.filter(Column::CampaignId.eq(cid.as_str()));
    }
    q
}

impl HubStore {
    /// 重复申请的前置检查：同一 (campaign, volunteer) 是否已有记录
    pub async fn application_exists(&self, campaign_id: &str, volunteer_id: &str) -> Result<bool> {
        let count = Entity::find()
            .filter(Column::CampaignId.eq(campaign_id))
            .filter(Column::VolunteerId.eq(volunteer_id))
            .count(self.db())
            .await?;
        Ok(count > 0)
    }

    pub async fn insert_campaign_application(
        &self,
        new: &NewApplication,
    ) -> Result<ApplicationRow> {
        let id = volink_common::id::next_id();
        let now = Utc::now().fixed_offset();
        let am = campaign_application::ActiveModel {
            id: Set(id),
            campaign_id: Set(new.campaign_id.clone()),
            volunteer_id: Set(new.volunteer_id.clone()),
            name: Set(new.name.clone()),
            email: Set(new.email.clone()),
            phone: Set(new.phone.clone()),
            interest: Set(new.interest.clone()),
            skills: Set(serde_json::to_string(&new.skills)?),
            experience: Set(new.experience.clone()),
            status: Set(ApplicationStatus::Pending.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        model_to_application(model)
    }

    pub async fn get_application_by_id(&self, id: &str) -> Result<Option<ApplicationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(model_to_application).transpose()
    }

    /// 志愿者本人的申请，最新优先
    pub async fn list_applications_by_volunteer(
        &self,
        volunteer_id: &str,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRow>> {
        let q = apply_application_filter(
            Entity::find().filter(Column::VolunteerId.eq(volunteer_id)),
            filter,
        );
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_application).collect()
    }

    /// 指定活动集合内的申请（机构审核视图），最新优先
    pub async fn list_applications_for_campaigns(
        &self,
        campaign_ids: &[String],
        filter: &ApplicationFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ApplicationRow>> {
        if campaign_ids.is_empty() {
            return Ok(Vec::new());
        }
        let q = apply_application_filter(
            Entity::find().filter(Column::CampaignId.is_in(campaign_ids.iter().cloned())),
            filter,
        );
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_application).collect()
    }

    pub async fn count_applications_for_campaigns(
        &self,
        campaign_ids: &[String],
        filter: &ApplicationFilter,
    ) -> Result<u64> {
        if campaign_ids.is_empty() {
            return Ok(0);
        }
        let q = apply_application_filter(
            Entity::find().filter(Column::CampaignId.is_in(campaign_ids.iter().cloned())),
            filter,
        );
        Ok(q.count(self.db()).await?)
    }

    /// 写入新的审核状态并刷新 updated_at。任意状态间均可迁移。
    pub async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: campaign_application::ActiveModel = m.into();
            am.status = Set(status.to_string());
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(model_to_application(updated)?))
        } else {
            Ok(None)
        }
    }
}
