//! Notification dispatcher: persist first, then push in real time.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{ChannelEvent, NewNotification, Notification, NotificationId, UserId};
use crate::error::GatewayError;
use crate::persistence::{NotificationPage, NotificationStore};
use crate::ws::Broadcaster;

/// Largest page size accepted by [`NotificationDispatcher::list`].
pub const MAX_PER_PAGE: u32 = 100;

/// Records notifications and forwards them to the recipient's channel.
///
/// The stored row is the source of truth. A failed realtime push is logged
/// and never undoes the insert; clients catch up through [`Self::list`].
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over `store` and `broadcaster`.
    #[must_use]
    pub fn new(store: Arc<dyn NotificationStore>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// Persists `new` and then publishes it on the recipient's channel.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] if the insert fails. Publish
    /// failures are not errors.
    pub async fn record(&self, new: NewNotification) -> Result<Notification, GatewayError> {
        let notification = new.into_notification(Utc::now());
        self.store.insert(&notification).await?;

        let recipient = notification.recipient_id;
        let event = ChannelEvent::NotificationNew {
            notification: notification.clone(),
        };
        match self.broadcaster.publish(recipient, event).await {
            Ok(delivered) => tracing::debug!(
                notification_id = %notification.id,
                user_id = %recipient,
                delivered,
                "notification pushed"
            ),
            Err(e) => tracing::warn!(
                notification_id = %notification.id,
                user_id = %recipient,
                error = %e,
                "notification stored but realtime push failed"
            ),
        }

        tracing::info!(
            notification_id = %notification.id,
            user_id = %recipient,
            notification_type = notification.notification_type.as_str(),
            "notification recorded"
        );
        Ok(notification)
    }

    /// Returns page `page` (1-based) of the recipient's notifications.
    /// `per_page` is clamped to `1..=MAX_PER_PAGE`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    pub async fn list(
        &self,
        recipient: UserId,
        unread_only: bool,
        page: u32,
        per_page: u32,
    ) -> Result<NotificationPage, GatewayError> {
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let offset = page.max(1).saturating_sub(1).saturating_mul(per_page);
        self.store.list(recipient, unread_only, per_page, offset).await
    }

    /// Counts the recipient's unread notifications.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    pub async fn unread_count(&self, recipient: UserId) -> Result<u64, GatewayError> {
        self.store.unread_count(recipient).await
    }

    /// Marks one of the recipient's notifications as read. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if `id` is unknown or belongs to
    /// someone else.
    pub async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<Notification, GatewayError> {
        self.store
            .mark_read(recipient, id, Utc::now())
            .await?
            .ok_or(GatewayError::NotFound("notification"))
    }

    /// Marks all of the recipient's notifications as read and returns how
    /// many were unread. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    pub async fn mark_all_read(&self, recipient: UserId) -> Result<u64, GatewayError> {
        let updated = self.store.mark_all_read(recipient, Utc::now()).await?;
        tracing::debug!(user_id = %recipient, updated, "notifications marked read");
        Ok(updated)
    }
}
