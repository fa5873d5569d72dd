//! Notification handlers: inbox listing and read tracking.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::parse_id;
use crate::api::auth::AuthUser;
use crate::api::dto::{
    MarkAllReadResponse, NotificationListQuery, NotificationListResponse, PaginationMeta,
    UnreadCountResponse,
};
use crate::app_state::AppState;
use crate::domain::{Notification, NotificationId};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /notifications` — The caller's notifications, newest first.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    summary = "List notifications",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Paginated notifications", body = NotificationListResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn list_notifications(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let paging = query.pagination();
    let page = state
        .notifications
        .list(caller, query.unread_only, paging.page, paging.per_page)
        .await?;

    Ok(Json(NotificationListResponse {
        data: page.items,
        pagination: PaginationMeta::new(paging.page, paging.per_page, page.total),
    }))
}

/// `GET /notifications/unread-count` — Badge counter.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "Notifications",
    summary = "Count unread notifications",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn unread_count(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let unread_count = state.notifications.unread_count(caller).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// `POST /notifications/{id}/read` — Mark one notification as read.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the notification is not the caller's.
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "Notifications",
    summary = "Mark a notification as read",
    description = "Idempotent. `read_at` keeps the time of the first read.",
    params(("id" = uuid::Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: NotificationId = parse_id(&id, "notification")?;
    Ok(Json(state.notifications.mark_read(caller, id).await?))
}

/// `POST /notifications/read-all` — Mark every notification as read.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "Notifications",
    summary = "Mark all notifications as read",
    description = "Idempotent. Returns how many notifications were unread.",
    responses(
        (status = 200, description = "Notifications marked read", body = MarkAllReadResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn mark_all_read(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let updated = state.notifications.mark_all_read(caller).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
}
