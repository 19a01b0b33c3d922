// Notification endpoints: inbox page, read state, live stream, and the
// generic transactional-mail send.
//
// Review and application events reach users on three paths with one call
// site: a stored row, a live feed push, and a best-effort email. Only the
// stored row is load-bearing; feed and mail failures are logged and
// swallowed so they can never fail the action that triggered them.

use crate::api::{
    error_response, is_valid_email, success_empty_response, success_response, ApiError,
};
use crate::auth::Claims;
use crate::feed::{FeedCursor, FeedEvent};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use volink_storage::{NewNotification, NotificationRow, ProfileRow};

/// 通知页大小：固定返回最近 20 条
const NOTIFICATIONS_PAGE_SIZE: usize = 20;

/// Subscriber-side dedupe window for re-delivered event ids.
const STREAM_DEDUPE_WINDOW: usize = 128;

/// 通知条目
#[derive(Serialize, ToSchema)]
pub struct NotificationResponse {
    /// 通知 ID
    pub id: String,
    /// 触发者档案 ID（系统通知为空）
    pub sender_id: Option<String>,
    /// 事件类型（application_received / application_status / ...）
    pub notification_type: String,
    /// 通知文案
    pub content: String,
    /// 附加 JSON 载荷（campaign_id、application_id、status 等）
    pub metadata: Value,
    /// 是否已读
    pub is_read: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl NotificationResponse {
    fn from_row(row: &NotificationRow) -> Self {
        let metadata = row
            .metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);
        Self {
            id: row.id.clone(),
            sender_id: row.sender_id.clone(),
            notification_type: row.notification_type.clone(),
            content: row.content.clone(),
            metadata,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// 通知页：最近 20 条加上其中的未读数
#[derive(Serialize, ToSchema)]
pub struct NotificationsPage {
    /// 最近的通知（最新在前）
    pub items: Vec<NotificationResponse>,
    /// 本页中的未读条数
    pub unread_count: usize,
}

/// 全部标记已读的结果
#[derive(Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// 本次被置为已读的条数
    pub updated: u64,
}

/// 手动发送通知邮件请求
#[derive(Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    /// 事件类型，必须有已注册的模板
    pub notification_type: String,
    /// 收件邮箱
    pub recipient_email: String,
    /// 模板载荷（字段要求取决于事件类型）
    #[serde(default)]
    pub data: Value,
}

/// Fan an event out to one recipient: stored row, live feed, email.
///
/// Mail and feed legs are best effort; a failed store insert is logged and
/// the remaining legs still run.
pub(crate) async fn fan_out_event(
    state: &AppState,
    recipient: &ProfileRow,
    sender_id: Option<String>,
    event_type: &str,
    content: String,
    metadata: Value,
    mail_payload: Value,
) {
    let new = NewNotification {
        recipient_id: recipient.id.clone(),
        sender_id,
        notification_type: event_type.to_string(),
        content,
        metadata: Some(metadata.to_string()),
    };
    match state.store.insert_notification(&new).await {
        Ok(row) => state.feed.publish(FeedEvent::from_row(&row)),
        Err(e) => {
            tracing::error!(
                error = %e,
                recipient_id = %recipient.id,
                event_type = %event_type,
                "Failed to record notification"
            );
        }
    }

    match volink_notify::templates::render_event(event_type, &mail_payload) {
        Ok((subject, body)) => {
            if let Err(e) = state.mailer.send(&recipient.email, &subject, &body).await {
                tracing::warn!(
                    error = %e,
                    recipient = %recipient.email,
                    event_type = %event_type,
                    "Event mail delivery failed"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, event_type = %event_type, "Event mail template failed");
        }
    }
}

/// 获取最近 20 条通知及其中的未读数。
/// 最新在前；未读数只统计返回的这一页。
#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "通知页", body = NotificationsPage),
        (status = 401, description = "未认证", body = ApiError)
    )
)]
async fn list_notifications(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state
        .store
        .list_notifications_for_recipient(&claims.sub, NOTIFICATIONS_PAGE_SIZE)
        .await
    {
        Ok(rows) => {
            let items: Vec<NotificationResponse> =
                rows.iter().map(NotificationResponse::from_row).collect();
            let unread_count = items.iter().filter(|n| !n.is_read).count();
            success_response(
                StatusCode::OK,
                &trace_id,
                NotificationsPage {
                    items,
                    unread_count,
                },
            )
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list notifications");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to list notifications",
            )
        }
    }
}

/// 将单条通知标记为已读。
/// 幂等：重复调用已读通知仍返回成功。
#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "通知 ID")),
    responses(
        (status = 200, description = "已标记为已读"),
        (status = 404, description = "通知不存在或不属于当前账号", body = ApiError)
    )
)]
async fn mark_read(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.mark_notification_read(&id, &claims.sub).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "marked read"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Notification not found",
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to mark notification read");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to mark notification read",
            )
        }
    }
}

/// 将当前账号全部通知标记为已读。
/// 幂等：没有未读通知时 updated 为 0。
#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "标记结果", body = MarkAllReadResponse),
        (status = 401, description = "未认证", body = ApiError)
    )
)]
async fn mark_all_read(
    Extension(trace_id): Extension<TraceId>,
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.mark_all_notifications_read(&claims.sub).await {
        Ok(updated) => {
            success_response(StatusCode::OK, &trace_id, MarkAllReadResponse { updated })
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to mark notifications read");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to mark notifications read",
            )
        }
    }
}

/// 订阅当前账号的实时通知流（Server-Sent Events）。
/// 每个事件以 `event: notification` 推送，载荷为通知 JSON；
/// 按事件 ID 去重，断线后由客户端重连。
#[utoipa::path(
    get,
    path = "/v1/notifications/stream",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "SSE 事件流", content_type = "text/event-stream"),
        (status = 401, description = "未认证", body = ApiError)
    )
)]
async fn stream_notifications(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.feed.subscribe();
    let recipient_id = claims.sub.clone();
    let mut cursor = FeedCursor::new(STREAM_DEDUPE_WINDOW);

    let stream = BroadcastStream::new(rx).filter_map(move |incoming| {
        let out = match incoming {
            Ok(event) if event.recipient_id == recipient_id && cursor.accept(&event.id) => {
                Some(Event::default().event("notification").json_data(&event))
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Live feed subscriber lagged, events skipped");
                None
            }
        };
        std::future::ready(out)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// 渲染模板并发送一封通知邮件。
/// 事件类型必须有已注册模板；载荷字段要求取决于事件类型。
#[utoipa::path(
    post,
    path = "/v1/notifications/send",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "邮件已发出"),
        (status = 400, description = "未知事件类型或载荷缺字段", body = ApiError),
        (status = 503, description = "邮件通道不可用", body = ApiError)
    )
)]
async fn send_notification(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<SendNotificationRequest>,
) -> impl IntoResponse {
    let recipient = req.recipient_email.trim().to_lowercase();
    if !is_valid_email(&recipient) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "A valid recipient_email is required",
        );
    }

    let (subject, body) =
        match volink_notify::templates::render_event(&req.notification_type, &req.data) {
            Ok(rendered) => rendered,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    &e.to_string(),
                );
            }
        };

    match state.mailer.send(&recipient, &subject, &body).await {
        Ok(()) => {
            tracing::info!(
                trace_id = %trace_id.0,
                notification_type = %req.notification_type,
                mailer = state.mailer.mailer_type(),
                "Notification mail sent"
            );
            success_empty_response(StatusCode::OK, &trace_id, "notification sent")
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Notification mail failed");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &trace_id,
                "mail_unavailable",
                "Mail delivery is unavailable",
            )
        }
    }
}

pub fn notification_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_notifications))
        .routes(routes!(mark_read))
        .routes(routes!(mark_all_read))
        .routes(routes!(stream_notifications))
        .routes(routes!(send_notification))
}
