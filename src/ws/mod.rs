//! Realtime layer: per-user channels, subscriptions and the `/ws` endpoint.
//!
//! Each user has one private channel, `notifications.{user_id}`. Only that
//! user may subscribe to it. Delivery is live-only; missed events are
//! recovered through the REST notification endpoints.

pub mod broadcaster;
pub mod channel;
pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;

pub use broadcaster::{Broadcaster, ChannelBroadcaster};
pub use channel::ChannelName;
pub use subscription::Subscription;
