use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use lectern_learning::{Notification, NotificationId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationsResponse {
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = Object)]
    pub notification: Notification,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub updated: usize,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationsResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let unread_count = account.engagement.unread_count();
    let notifications = state
        .learners()
        .list_notifications(account.id, query.unread_only.unwrap_or(false))
        .await?;

    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationResponse),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<NotificationId>,
    headers: HeaderMap,
) -> Result<Json<NotificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let notification = state
        .learners()
        .mark_notification_read(account.id, notification_id)
        .await?;
    Ok(Json(NotificationResponse { notification }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses(
        (status = 200, description = "Unread notifications marked read", body = BulkUpdateResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let updated = state
        .learners()
        .mark_all_notifications_read(account.id)
        .await?;
    Ok(Json(BulkUpdateResponse { updated }))
}
