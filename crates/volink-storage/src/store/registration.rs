use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use volink_common::types::ApplicationStatus;

use crate::entities::volunteer_registration::{self, Column, Entity};
use crate::store::HubStore;

/// 志愿者与机构的注册关系数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub id: String,
    pub volunteer_id: String,
    pub ngo_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Option<String>,
    /// 可投入时间（自由文本，如 "weekends"）
    pub availability: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建注册参数（状态固定从 pending 开始）
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub volunteer_id: String,
    pub ngo_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Option<String>,
    pub availability: Option<String>,
}

/// 注册过滤条件
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub status_eq: Option<ApplicationStatus>,
}

fn model_to_registration(m: volunteer_registration::Model) -> Result<RegistrationRow> {
    let status = m
        .status
        .parse::<ApplicationStatus>()
        .map_err(|e| anyhow::anyhow!("registration {}: {e}", m.id))?;
    Ok(RegistrationRow {
        id: m.id,
        volunteer_id: m.volunteer_id,
        ngo_id: m.ngo_id,
        name: m.name,
        email: m.email,
        phone: m.phone,
        interest: m.interest,
        availability: m.availability,
        status,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn apply_registration_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &RegistrationFilter,
) -> sea_orm::Select<Entity> {
    if let Some(status) = filter.status_eq {
        q = q.filter(Column::Status.eq(status.to_string()));
    }
    q
}

impl HubStore {
    /// 重复注册的前置检查：同一 (ngo, volunteer) 是否已有记录
    pub async fn registration_exists(&self, ngo_id: &str, volunteer_id: &str) -> Result<bool> {
        let count = Entity::find()
            .filter(Column::NgoId.eq(ngo_id))
            .filter(Column::VolunteerId.eq(volunteer_id))
            .count(self.db())
            .await?;
        Ok(count > 0)
    }

    pub async fn insert_volunteer_registration(
        &self,
        new: &NewRegistration,
    ) -> Result<RegistrationRow> {
        let id = volink_common::id::next_id();
        let now = Utc::now().fixed_offset();
        let am = volunteer_registration::ActiveModel {
            id: Set(id),
            volunteer_id: Set(new.volunteer_id.clone()),
            ngo_id: Set(new.ngo_id.clone()),
            name: Set(new.name.clone()),
            email: Set(new.email.clone()),
            phone: Set(new.phone.clone()),
            interest: Set(new.interest.clone()),
            availability: Set(new.availability.clone()),
            status: Set(ApplicationStatus::Pending.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        model_to_registration(model)
    }

    pub async fn get_registration_by_id(&self, id: &str) -> Result<Option<RegistrationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(model_to_registration).transpose()
    }

    /// 志愿者本人的注册记录，最新优先
    pub async fn list_registrations_by_volunteer(
        &self,
        volunteer_id: &str,
        filter: &RegistrationFilter,
    ) -> Result<Vec<RegistrationRow>> {
        let q = apply_registration_filter(
            Entity::find().filter(Column::VolunteerId.eq(volunteer_id)),
            filter,
        );
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_registration).collect()
    }

    /// 机构收到的注册（审核视图），最新优先
    pub async fn list_registrations_for_ngo(
        &self,
        ngo_id: &str,
        filter: &RegistrationFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RegistrationRow>> {
        let q =
            apply_registration_filter(Entity::find().filter(Column::NgoId.eq(ngo_id)), filter);
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_registration).collect()
    }

    pub async fn count_registrations_for_ngo(
        &self,
        ngo_id: &str,
        filter: &RegistrationFilter,
    ) -> Result<u64> {
        let q =
            apply_registration_filter(Entity::find().filter(Column::NgoId.eq(ngo_id)), filter);
        Ok(q.count(self.db()).await?)
    }

    /// 写入新的审核状态并刷新 updated_at。任意状态间均可迁移。
    pub async fn update_registration_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<RegistrationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: volunteer_registration::ActiveModel = m.into();
            am.status = Set(status.to_string());
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(model_to_registration(updated)?))
        } else {
            Ok(None)
        }
    }
}
