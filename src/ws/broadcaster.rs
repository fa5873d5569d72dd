//! Per-user publish/subscribe channels.
//!
//! [`ChannelBroadcaster`] keeps one [`tokio::sync::broadcast`] channel per
//! user that currently has at least one live subscription. Publishing to a
//! user without subscribers is a no-op: there is no persistence and no
//! offline delivery here, the notification table is the durable record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::channel::{self, ChannelName};
use super::subscription::Subscription;
use crate::domain::{ChannelEvent, UserId};
use crate::error::GatewayError;

/// Delivery of realtime events to a user's private channel.
#[async_trait]
pub trait Broadcaster: Send + Sync + std::fmt::Debug {
    /// Fans `event` out to every current subscription of `recipient` and
    /// returns how many received it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ExternalServiceDegraded`] if the transport is
    /// unavailable.
    async fn publish(&self, recipient: UserId, event: ChannelEvent) -> Result<usize, GatewayError>;
}

#[derive(Debug)]
struct UserChannel {
    sender: broadcast::Sender<ChannelEvent>,
    connections: HashSet<Uuid>,
}

/// In-process broadcaster backing the `/ws` endpoint.
///
/// Each user channel is a ring buffer of `capacity` events. When it is full,
/// lagging receivers lose the oldest events.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    channels: Arc<RwLock<HashMap<UserId, UserChannel>>>,
    capacity: usize,
}

impl ChannelBroadcaster {
    /// Creates a broadcaster whose per-user channels buffer `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes `subscriber` to the channel named `channel_name`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for a malformed name and
    /// [`GatewayError::Authorization`] if the channel belongs to someone else.
    pub async fn subscribe(
        &self,
        subscriber: UserId,
        channel_name: &str,
    ) -> Result<Subscription, GatewayError> {
        let channel = channel::authorize(subscriber, channel_name)?;
        let connection_id = Uuid::new_v4();

        let mut channels = self.channels.write().await;
        let entry = channels
            .entry(subscriber)
            .or_insert_with(|| UserChannel {
                sender: broadcast::channel(self.capacity).0,
                connections: HashSet::new(),
            });
        entry.connections.insert(connection_id);
        let receiver = entry.sender.subscribe();

        tracing::debug!(user_id = %subscriber, %channel, %connection_id, "channel subscribed");
        Ok(Subscription {
            connection_id,
            user_id: subscriber,
            channel,
            receiver,
        })
    }

    /// Ends `subscription`, using the identity it captured at creation.
    pub async fn unsubscribe(&self, subscription: Subscription) {
        let user_id = subscription.user_id;
        let mut channels = self.channels.write().await;
        if let Some(entry) = channels.get_mut(&user_id) {
            entry.connections.remove(&subscription.connection_id);
            if entry.connections.is_empty() {
                channels.remove(&user_id);
            }
        }
        tracing::debug!(
            %user_id,
            channel = %subscription.channel,
            connection_id = %subscription.connection_id,
            "channel unsubscribed"
        );
    }

    /// Number of live subscriptions of `user`.
    pub async fn subscriber_count(&self, user: UserId) -> usize {
        self.channels
            .read()
            .await
            .get(&user)
            .map_or(0, |c| c.connections.len())
    }

    /// Number of users with at least one live subscription.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, recipient: UserId, event: ChannelEvent) -> Result<usize, GatewayError> {
        let channels = self.channels.read().await;
        let Some(entry) = channels.get(&recipient) else {
            tracing::trace!(user_id = %recipient, "no live subscription, event not delivered");
            return Ok(0);
        };
        let delivered = entry.sender.send(event).unwrap_or(0);
        tracing::debug!(
            user_id = %recipient,
            channel = %ChannelName::for_user(recipient),
            delivered,
            "channel event published"
        );
        Ok(delivered)
    }
}
