use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::notification::{self, Column, Entity};
use crate::store::HubStore;

/// 站内通知数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: Option<String>,
    /// 事件类型（application_received / application_status / ...）
    pub notification_type: String,
    pub content: String,
    /// 附加 JSON 载荷（campaign_id、application_id、status 等）
    pub metadata: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// 新建通知参数（is_read 固定从 false 开始）
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub notification_type: String,
    pub content: String,
    pub metadata: Option<String>,
}

fn model_to_notification(m: notification::Model) -> NotificationRow {
    NotificationRow {
        id: m.id,
        recipient_id: m.recipient_id,
        sender_id: m.sender_id,
        notification_type: m.notification_type,
        content: m.content,
        metadata: m.metadata,
        is_read: m.is_read,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl HubStore {
    pub async fn insert_notification(&self, new: &NewNotification) -> Result<NotificationRow> {
        let id = volink_common::id::next_id();
        let now = Utc::now().fixed_offset();
        let am = notification::ActiveModel {
            id: Set(id),
            recipient_id: Set(new.recipient_id.clone()),
            sender_id: Set(new.sender_id.clone()),
            notification_type: Set(new.notification_type.clone()),
            content: Set(new.content.clone()),
            metadata: Set(new.metadata.clone()),
            is_read: Set(false),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_notification(model))
    }

    /// 收件人最近的通知，最新优先
    pub async fn list_notifications_for_recipient(
        &self,
        recipient_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRow>> {
        let rows = Entity::find()
            .filter(Column::RecipientId.eq(recipient_id))
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_notification).collect())
    }

    /// 单条标记已读（限定收件人本人）。
    /// 返回 false 表示该收件人名下没有这条通知；重复标记视为成功。
    pub async fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        let model = Entity::find_by_id(id)
            .filter(Column::RecipientId.eq(recipient_id))
            .one(self.db())
            .await?;
        if let Some(m) = model {
            if !m.is_read {
                let mut am: notification::ActiveModel = m.into();
                am.is_read = Set(true);
                am.update(self.db()).await?;
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 批量标记收件人全部未读为已读，单条 UPDATE 语句。
    /// 返回受影响行数；没有未读时为 0（无错误）。
    pub async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<u64> {
        let res = Entity::update_many()
            .col_expr(Column::IsRead, Expr::value(true))
            .filter(Column::RecipientId.eq(recipient_id))
            .filter(Column::IsRead.eq(false))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
