use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::profile::{self, Column, Entity};
use crate::store::HubStore;

/// 用户档案数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    /// bcrypt 哈希；OTP 首次登录创建的账号没有密码
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub is_ngo: bool,
    pub full_name: Option<String>,
    pub ngo_name: Option<String>,
    pub ngo_description: Option<String>,
    pub ngo_website: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// 展示名称：机构账号取 ngo_name，志愿者取 full_name，都缺省回退到邮箱
    pub fn display_name(&self) -> &str {
        let name = if self.is_ngo {
            self.ngo_name.as_deref()
        } else {
            self.full_name.as_deref()
        };
        name.unwrap_or(&self.email)
    }
}

/// 新建档案参数
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub password_hash: Option<String>,
    pub is_ngo: bool,
    pub full_name: Option<String>,
    pub ngo_name: Option<String>,
}

/// 档案更新请求（仅覆盖提供的字段）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub ngo_name: Option<String>,
    pub ngo_description: Option<String>,
    pub ngo_website: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// 档案过滤条件
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub is_ngo_eq: Option<bool>,
}

fn model_to_profile(m: profile::Model) -> ProfileRow {
    ProfileRow {
        id: m.id,
        email: m.email,
        password_hash: m.password_hash,
        is_ngo: m.is_ngo,
        full_name: m.full_name,
        ngo_name: m.ngo_name,
        ngo_description: m.ngo_description,
        ngo_website: m.ngo_website,
        avatar_url: m.avatar_url,
        bio: m.bio,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl HubStore {
    pub async fn create_profile(&self, new: &NewProfile) -> Result<ProfileRow> {
        let id = volink_common::id::next_id();
        let now = Utc::now().fixed_offset();
        let am = profile::ActiveModel {
            id: Set(id),
            email: Set(new.email.clone()),
            password_hash: Set(new.password_hash.clone()),
            is_ngo: Set(new.is_ngo),
            full_name: Set(new.full_name.clone()),
            ngo_name: Set(new.ngo_name.clone()),
            ngo_description: Set(None),
            ngo_website: Set(None),
            avatar_url: Set(None),
            bio: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_profile(model))
    }

    pub async fn get_profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(model_to_profile))
    }

    pub async fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>> {
        let model = Entity::find()
            .filter(Column::Email.eq(email))
            .one(self.db())
            .await?;
        Ok(model.map(model_to_profile))
    }

    /// 批量按 ID 取档案（用于列表页展示名称的回填）
    pub async fn get_profiles_by_ids(&self, ids: &[String]) -> Result<Vec<ProfileRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Entity::find()
            .filter(Column::Id.is_in(ids.iter().cloned()))
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_profile).collect())
    }

    pub async fn update_profile(
        &self,
        id: &str,
        upd: &ProfileUpdate,
    ) -> Result<Option<ProfileRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: profile::ActiveModel = m.into();
            if let Some(ref v) = upd.full_name {
                am.full_name = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.ngo_name {
                am.ngo_name = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.ngo_description {
                am.ngo_description = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.ngo_website {
                am.ngo_website = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.avatar_url {
                am.avatar_url = Set(Some(v.clone()));
            }
            if let Some(ref v) = upd.bio {
                am.bio = Set(Some(v.clone()));
            }
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(model_to_profile(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ProfileRow>> {
        let mut q = Entity::find();
        if let Some(is_ngo) = filter.is_ngo_eq {
            q = q.filter(Column::IsNgo.eq(is_ngo));
        }
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_profile).collect())
    }

    pub async fn count_profiles(&self, filter: &ProfileFilter) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(is_ngo) = filter.is_ngo_eq {
            q = q.filter(Column::IsNgo.eq(is_ngo));
        }
        Ok(q.count(self.db()).await?)
    }
}
