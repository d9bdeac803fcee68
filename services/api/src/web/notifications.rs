//! services/api/src/web/notifications.rs
//!
//! REST handlers for the signed-in user's notification inbox.

use axum::extract::State;
use notice_board_core::domain::Page;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{MarkAllReadDto, NotificationDto, NotificationListDto, UnreadCountDto};
use crate::web::middleware::{CurrentUser, PathParam, QueryParams};
use crate::web::rest::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /notifications - A page of notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    params(NotificationsQuery),
    responses(
        (status = 200, description = "Notifications and the unread count", body = NotificationListDto),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    QueryParams(params): QueryParams<NotificationsQuery>,
) -> Result<ApiResponse<NotificationListDto>, ApiError> {
    let page = Page::new(params.page, params.limit);
    let (notifications, unread) = state
        .notifications
        .list(&user, params.unread_only, page)
        .await?;
    Ok(ApiResponse::ok(NotificationListDto::new(notifications, unread)))
}

/// GET /notifications/unread-count
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    responses(
        (status = 200, description = "Number of unread notifications", body = UnreadCountDto),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unread_count_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<UnreadCountDto>, ApiError> {
    let unread_count = state.notifications.unread_count(&user).await?;
    Ok(ApiResponse::ok(UnreadCountDto { unread_count }))
}

/// PUT /notifications/{id}/read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked as read", body = NotificationDto),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(notification_id): PathParam<Uuid>,
) -> Result<ApiResponse<NotificationDto>, ApiError> {
    let notification = state.notifications.mark_read(&user, notification_id).await?;
    Ok(ApiResponse::ok(notification.into()))
}

/// PUT /notifications/read-all
#[utoipa::path(
    put,
    path = "/notifications/read-all",
    responses(
        (status = 200, description = "All notifications marked as read", body = MarkAllReadDto),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<MarkAllReadDto>, ApiError> {
    let updated = state.notifications.mark_all_read(&user).await?;
    Ok(ApiResponse::ok_with_message(
        MarkAllReadDto { updated },
        "All notifications marked as read",
    ))
}

/// DELETE /notifications/{id}
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_notification_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(notification_id): PathParam<Uuid>,
) -> Result<ApiResponse<()>, ApiError> {
    state.notifications.delete(&user, notification_id).await?;
    Ok(ApiResponse::message("Notification deleted"))
}
