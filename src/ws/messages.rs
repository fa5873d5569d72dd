//! WebSocket message types: envelope, commands, and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::ChannelName;
use crate::domain::ChannelEvent;
use crate::error::GatewayError;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client channel event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send in a `command` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Listen on a private channel, replacing any current subscription.
    Subscribe {
        /// Channel name, `notifications.{user_id}`.
        channel: String,
    },
    /// Stop listening.
    Unsubscribe,
}

impl WsMessage {
    fn new(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Reply to the command with id `request_id`.
    #[must_use]
    pub fn response(request_id: String, payload: serde_json::Value) -> Self {
        Self::new(request_id, WsMessageType::Response, payload)
    }

    /// Error reply carrying the same `{kind, code, message}` body as REST.
    #[must_use]
    pub fn error(request_id: String, error: &GatewayError) -> Self {
        Self::new(
            request_id,
            WsMessageType::Error,
            serde_json::json!({
                "kind": error.kind(),
                "code": error.error_code(),
                "message": error.to_string(),
            }),
        )
    }

    /// Server push of `event` on `channel`.
    #[must_use]
    pub fn event(channel: ChannelName, event: &ChannelEvent) -> Self {
        let mut payload = serde_json::to_value(event).unwrap_or_default();
        if let Some(object) = payload.as_object_mut() {
            object.insert(
                "channel".to_string(),
                serde_json::Value::String(channel.to_string()),
            );
        }
        Self::new(uuid::Uuid::new_v4().to_string(), WsMessageType::Event, payload)
    }

    /// Serializes the envelope for the wire.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
