//! Session-scoped subscription handle.
//!
//! A [`Subscription`] captures the subscriber's identity when it is created.
//! Unsubscribing goes through the handle, so teardown never depends on
//! whatever "current user" context exists at that later moment.

use tokio::sync::broadcast;
use uuid::Uuid;

use super::channel::ChannelName;
use crate::domain::{ChannelEvent, UserId};

/// Live subscription of one connection to one private channel.
#[derive(Debug)]
pub struct Subscription {
    pub(super) connection_id: Uuid,
    pub(super) user_id: UserId,
    pub(super) channel: ChannelName,
    pub(super) receiver: broadcast::Receiver<ChannelEvent>,
}

impl Subscription {
    /// The subscriber, as authenticated when the handle was created.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The subscribed channel.
    #[must_use]
    pub const fn channel(&self) -> ChannelName {
        self.channel
    }

    /// Connection-unique id of this handle.
    #[must_use]
    pub const fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Waits for the next event on the channel.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Lagged`] when the subscriber
    /// fell behind and events were dropped, or `Closed` once the channel is
    /// gone.
    pub async fn recv(&mut self) -> Result<ChannelEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}
