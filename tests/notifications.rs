//! Notification inbox, calendar credential and channel authorization
//! endpoints over HTTP.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use reqwest::Method;
use serde_json::{Value, json};

use common::{TestServer, error_kind};
use rdv_gateway::domain::UserId;

#[tokio::test]
async fn inbox_read_flow() {
    let server = TestServer::spawn().await;
    let owner = UserId::new();
    server.book(UserId::new(), owner).await;
    server.book(UserId::new(), owner).await;

    let (status, count) = server.get("/notifications/unread-count", owner).await;
    assert_eq!(status, 200);
    assert_eq!(count["unread_count"], json!(2));

    let (_, inbox) = server.get("/notifications", owner).await;
    let Some(first) = inbox["data"][0]["id"].as_str() else {
        panic!("inbox should list notifications: {inbox}");
    };

    let (status, read) = server
        .post(&format!("/notifications/{first}/read"), owner, None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(read["is_read"], json!(true));
    assert!(read["read_at"].is_string());

    let (_, unread) = server.get("/notifications?unread_only=true", owner).await;
    assert_eq!(unread["pagination"]["total"], json!(1));

    let (status, all) = server.post("/notifications/read-all", owner, None).await;
    assert_eq!(status, 200);
    assert_eq!(all["updated"], json!(1));

    let (_, again) = server.post("/notifications/read-all", owner, None).await;
    assert_eq!(again["updated"], json!(0));

    let (_, count) = server.get("/notifications/unread-count", owner).await;
    assert_eq!(count["unread_count"], json!(0));
}

#[tokio::test]
async fn notifications_of_others_are_not_found() {
    let server = TestServer::spawn().await;
    let owner = UserId::new();
    server.book(UserId::new(), owner).await;

    let (_, inbox) = server.get("/notifications", owner).await;
    let Some(id) = inbox["data"][0]["id"].as_str() else {
        panic!("inbox should list notifications: {inbox}");
    };

    let (status, body) = server
        .post(&format!("/notifications/{id}/read"), UserId::new(), None)
        .await;
    assert_eq!(status, 404);
    assert_eq!(error_kind(&body), Some("not_found"));
}

#[tokio::test]
async fn inbox_pagination_is_clamped() {
    let server = TestServer::spawn().await;
    let owner = UserId::new();
    for _ in 0..3 {
        server.book(UserId::new(), owner).await;
    }

    let (_, page) = server.get("/notifications?per_page=2&page=2", owner).await;
    assert_eq!(page["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["pagination"]["total_pages"], json!(2));

    let (status, page) = server.get("/notifications?per_page=0&page=0", owner).await;
    assert_eq!(status, 200);
    assert_eq!(page["pagination"]["page"], json!(1));
    assert_eq!(page["pagination"]["per_page"], json!(1));
}

#[tokio::test]
async fn calendar_credentials_lifecycle() {
    let server = TestServer::spawn().await;
    let owner = UserId::new();

    let (status, before) = server.get("/calendar/credentials", owner).await;
    assert_eq!(status, 200);
    assert_eq!(before["connected"], json!(false));

    server.connect_calendar(owner).await;
    let (_, after) = server.get("/calendar/credentials", owner).await;
    assert_eq!(after["connected"], json!(true));
    assert!(after["expires_at"].is_string());

    let (status, _) = server
        .request(Method::DELETE, "/calendar/credentials", Some(owner), None)
        .await;
    assert_eq!(status, 204);
    let (_, gone) = server.get("/calendar/credentials", owner).await;
    assert_eq!(gone["connected"], json!(false));
}

#[tokio::test]
async fn blank_calendar_tokens_are_rejected() {
    let server = TestServer::spawn().await;
    let (status, body) = server
        .request(
            Method::PUT,
            "/calendar/credentials",
            Some(UserId::new()),
            Some(json!({ "access_token": " ", "refresh_token": "r", "expires_in": 3600 })),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(error_kind(&body), Some("validation_error"));
}

#[tokio::test]
async fn oversized_token_lifetime_is_rejected() {
    let server = TestServer::spawn().await;
    let owner = UserId::new();
    let (status, body) = server
        .request(
            Method::PUT,
            "/calendar/credentials",
            Some(owner),
            Some(json!({ "access_token": "a", "refresh_token": "r", "expires_in": i64::MAX })),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(error_kind(&body), Some("validation_error"));

    let (status, after) = server.get("/calendar/credentials", owner).await;
    assert_eq!(status, 200);
    assert_eq!(after["connected"], json!(false));
}

#[tokio::test]
async fn channel_authorization_is_per_user() {
    let server = TestServer::spawn().await;
    let user = UserId::new();
    let own = format!("notifications.{user}");

    let (status, body) = server
        .post("/broadcasting/auth", user, Some(json!({ "channel_name": own })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["channel"], Value::String(own));
    assert_eq!(body["authorized"], json!(true));

    let foreign = format!("notifications.{}", UserId::new());
    let (status, body) = server
        .post("/broadcasting/auth", user, Some(json!({ "channel_name": foreign })))
        .await;
    assert_eq!(status, 403);
    assert_eq!(error_kind(&body), Some("authorization_error"));

    let (status, body) = server
        .post("/broadcasting/auth", user, Some(json!({ "channel_name": "presence.lobby" })))
        .await;
    assert_eq!(status, 400);
    assert_eq!(error_kind(&body), Some("validation_error"));
}
