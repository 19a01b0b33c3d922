use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::otp_code::{self, Column, Entity};
use crate::store::HubStore;

/// 邮箱登录验证码数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpCodeRow {
    pub id: String,
    pub email: String,
    /// 6 位数字验证码（明文存储，生命周期 5 分钟）
    pub otp_code: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

fn model_to_otp(m: otp_code::Model) -> OtpCodeRow {
    OtpCodeRow {
        id: m.id,
        email: m.email,
        otp_code: m.otp_code,
        expires_at: m.expires_at.with_timezone(&Utc),
        used: m.used,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl HubStore {
    /// 写入新验证码，先删除该邮箱现存的全部验证码。
    /// 每个邮箱同一时刻最多一个有效验证码。
    pub async fn replace_otp_code(
        &self,
        email: &str,
        otp_code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpCodeRow> {
        Entity::delete_many()
            .filter(Column::Email.eq(email))
            .exec(self.db())
            .await?;

        let id = volink_common::id::next_id();
        let now = Utc::now().fixed_offset();
        let am = otp_code::ActiveModel {
            id: Set(id),
            email: Set(email.to_owned()),
            otp_code: Set(otp_code.to_owned()),
            expires_at: Set(expires_at.fixed_offset()),
            used: Set(false),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_otp(model))
    }

    /// 该邮箱最新的未使用验证码（过期与否由调用方判定，以便区分错误码）
    pub async fn get_live_otp_code(&self, email: &str) -> Result<Option<OtpCodeRow>> {
        let model = Entity::find()
            .filter(Column::Email.eq(email))
            .filter(Column::Used.eq(false))
            .order_by(Column::CreatedAt, Order::Desc)
            .one(self.db())
            .await?;
        Ok(model.map(model_to_otp))
    }

    /// 单次使用：校验通过后立刻置位
    pub async fn mark_otp_code_used(&self, id: &str) -> Result<bool> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let mut am: otp_code::ActiveModel = m.into();
            am.used = Set(true);
            am.update(self.db()).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 机会式清理：删除所有已过期的验证码，由校验路径顺带触发。
    /// 返回删除行数。
    pub async fn purge_expired_otp_codes(&self, now: DateTime<Utc>) -> Result<u64> {
        let res = Entity::delete_many()
            .filter(Column::ExpiresAt.lt(now.fixed_offset()))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
