//! Realtime delivery over `/ws`: private channel subscription and live
//! notification push.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use common::TestServer;
use rdv_gateway::domain::UserId;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn open(server: &TestServer, user: UserId) -> Socket {
    let Ok(mut request) = server.ws_url().into_client_request() else {
        panic!("ws url should be valid");
    };
    let Ok(value) = HeaderValue::from_str(&user.to_string()) else {
        panic!("user id should be a valid header value");
    };
    request.headers_mut().insert("x-user-id", value);
    let Ok((socket, _)) = connect_async(request).await else {
        panic!("ws handshake should succeed");
    };
    socket
}

async fn send_command(socket: &mut Socket, id: &str, payload: Value) {
    let envelope = json!({
        "id": id,
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": payload,
    });
    let sent = socket.send(Message::text(envelope.to_string())).await;
    assert!(sent.is_ok(), "command should be sent");
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let Ok(Some(Ok(message))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("expected a ws message within 5s");
        };
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
        }
    }
}

#[tokio::test]
async fn subscribed_owner_receives_new_request_live() {
    let server = TestServer::spawn().await;
    let (client, owner) = (UserId::new(), UserId::new());
    let channel = format!("notifications.{owner}");

    let mut socket = open(&server, owner).await;
    send_command(
        &mut socket,
        "sub-1",
        json!({ "command": "subscribe", "channel": channel }),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], json!("response"));
    assert_eq!(reply["id"], json!("sub-1"));
    assert_eq!(reply["payload"]["subscribed"], json!(channel));

    let id = server.book(client, owner).await;

    let event = next_json(&mut socket).await;
    assert_eq!(event["type"], json!("event"));
    assert_eq!(event["payload"]["event"], json!("notification.new"));
    assert_eq!(event["payload"]["channel"], json!(channel));
    let notification = &event["payload"]["data"]["notification"];
    assert_eq!(notification["type"], json!("rdv_requested"));
    assert_eq!(notification["payload"]["appointment_id"], json!(id));
}

#[tokio::test]
async fn foreign_channel_subscription_is_refused() {
    let server = TestServer::spawn().await;
    let (me, other) = (UserId::new(), UserId::new());

    let mut socket = open(&server, me).await;
    send_command(
        &mut socket,
        "sub-2",
        json!({ "command": "subscribe", "channel": format!("notifications.{other}") }),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], json!("error"));
    assert_eq!(reply["id"], json!("sub-2"));
    assert_eq!(reply["payload"]["kind"], json!("authorization_error"));
}

#[tokio::test]
async fn unsubscribed_socket_gets_no_events() {
    let server = TestServer::spawn().await;
    let owner = UserId::new();

    let mut socket = open(&server, owner).await;
    send_command(
        &mut socket,
        "sub-3",
        json!({ "command": "subscribe", "channel": format!("notifications.{owner}") }),
    )
    .await;
    next_json(&mut socket).await;
    send_command(&mut socket, "unsub-3", json!({ "command": "unsubscribe" })).await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["payload"]["unsubscribed"], json!(format!("notifications.{owner}")));

    server.book(UserId::new(), owner).await;

    let quiet = tokio::time::timeout(Duration::from_millis(300), socket.next()).await;
    assert!(quiet.is_err(), "no event should arrive after unsubscribing");
}

#[tokio::test]
async fn handshake_without_identity_is_rejected() {
    let server = TestServer::spawn().await;
    let result = connect_async(server.ws_url()).await;
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("unexpected handshake error: {other}"),
        Ok(_) => panic!("handshake should be refused"),
    }
}
