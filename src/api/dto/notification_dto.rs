//! Request/response DTOs for notification endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, PaginationParams, default_page, default_per_page};
use crate::domain::Notification;

/// `GET /notifications` query parameters.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct NotificationListQuery {
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl NotificationListQuery {
    /// Paging part of the query, clamped.
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
        .clamped()
    }
}

/// `GET /notifications` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationListResponse {
    /// Notifications on this page, newest first.
    pub data: Vec<Notification>,
    /// Paging metadata.
    pub pagination: PaginationMeta,
}

/// `GET /notifications/unread-count` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    /// Unread notifications of the caller.
    pub unread_count: u64,
}

/// `POST /notifications/read-all` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Notifications that were unread before the call.
    pub updated: u64,
}
