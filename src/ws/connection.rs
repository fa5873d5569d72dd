//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection: commands
//! from the client manage at most one private-channel subscription, and
//! events on that subscription are forwarded to the client.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::broadcaster::ChannelBroadcaster;
use super::messages::{WsCommand, WsMessage};
use super::subscription::Subscription;
use crate::domain::{ChannelEvent, UserId};
use crate::error::GatewayError;

/// Runs the read/write loop for the connection of authenticated `user`.
///
/// On exit any live subscription is released through its handle.
pub async fn run_connection(socket: WebSocket, user: UserId, broadcaster: Arc<ChannelBroadcaster>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply =
                            handle_text_message(&text, user, &broadcaster, &mut subscription).await;
                        if ws_tx.send(Message::text(reply.to_json())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            event = next_event(&mut subscription) => {
                match event {
                    Ok(event) => {
                        let Some(channel) = subscription.as_ref().map(Subscription::channel) else {
                            continue;
                        };
                        let msg = WsMessage::event(channel, &event);
                        if ws_tx.send(Message::text(msg.to_json())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(user_id = %user, lagged = n, "ws client lagged behind its channel");
                    }
                    Err(RecvError::Closed) => subscription = None,
                }
            }
        }
    }

    if let Some(sub) = subscription.take() {
        broadcaster.unsubscribe(sub).await;
    }
    tracing::debug!(user_id = %user, "ws connection closed");
}

async fn next_event(subscription: &mut Option<Subscription>) -> Result<ChannelEvent, RecvError> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

/// Handles a text frame from the client and returns the reply envelope.
async fn handle_text_message(
    text: &str,
    user: UserId,
    broadcaster: &ChannelBroadcaster,
    subscription: &mut Option<Subscription>,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error(
            String::new(),
            &GatewayError::Validation("malformed JSON".to_string()),
        );
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(
            msg.id,
            &GatewayError::Validation("unknown command".to_string()),
        );
    };

    match command {
        WsCommand::Subscribe { channel } => {
            if let Some(previous) = subscription.take() {
                broadcaster.unsubscribe(previous).await;
            }
            match broadcaster.subscribe(user, &channel).await {
                Ok(sub) => {
                    let channel = sub.channel().to_string();
                    *subscription = Some(sub);
                    WsMessage::response(msg.id, serde_json::json!({ "subscribed": channel }))
                }
                Err(e) => {
                    tracing::warn!(user_id = %user, %channel, error = %e, "ws subscription refused");
                    WsMessage::error(msg.id, &e)
                }
            }
        }
        WsCommand::Unsubscribe => {
            let channel = match subscription.take() {
                Some(sub) => {
                    let channel = sub.channel().to_string();
                    broadcaster.unsubscribe(sub).await;
                    Some(channel)
                }
                None => None,
            };
            WsMessage::response(msg.id, serde_json::json!({ "unsubscribed": channel }))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::ws::channel::ChannelName;
    use crate::ws::messages::WsMessageType;

    fn command(payload: serde_json::Value) -> String {
        serde_json::json!({
            "id": "req-1",
            "type": "command",
            "timestamp": chrono::Utc::now(),
            "payload": payload,
        })
        .to_string()
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_own_channel() {
        let broadcaster = ChannelBroadcaster::new(8);
        let user = UserId::new();
        let name = ChannelName::for_user(user).to_string();
        let mut subscription = None;

        let reply = handle_text_message(
            &command(serde_json::json!({"command": "subscribe", "channel": name})),
            user,
            &broadcaster,
            &mut subscription,
        )
        .await;
        assert_eq!(reply.msg_type, WsMessageType::Response);
        assert_eq!(reply.payload["subscribed"], name);
        assert_eq!(broadcaster.subscriber_count(user).await, 1);

        let reply = handle_text_message(
            &command(serde_json::json!({"command": "unsubscribe"})),
            user,
            &broadcaster,
            &mut subscription,
        )
        .await;
        assert_eq!(reply.payload["unsubscribed"], name);
        assert!(subscription.is_none());
        assert_eq!(broadcaster.subscriber_count(user).await, 0);
    }

    #[tokio::test]
    async fn foreign_channel_yields_authorization_error() {
        let broadcaster = ChannelBroadcaster::new(8);
        let user = UserId::new();
        let other = ChannelName::for_user(UserId::new()).to_string();
        let mut subscription = None;

        let reply = handle_text_message(
            &command(serde_json::json!({"command": "subscribe", "channel": other})),
            user,
            &broadcaster,
            &mut subscription,
        )
        .await;
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(reply.payload["kind"], "authorization_error");
        assert!(subscription.is_none());
    }

    #[tokio::test]
    async fn garbage_is_reported_not_fatal() {
        let broadcaster = ChannelBroadcaster::new(8);
        let mut subscription = None;

        let reply =
            handle_text_message("{not json", UserId::new(), &broadcaster, &mut subscription).await;
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(reply.payload["kind"], "validation_error");

        let reply = handle_text_message(
            &command(serde_json::json!({"command": "swap"})),
            UserId::new(),
            &broadcaster,
            &mut subscription,
        )
        .await;
        assert_eq!(reply.id, "req-1");
        assert_eq!(reply.msg_type, WsMessageType::Error);
    }
}
