//! Shared harness for the end-to-end tests: a live server on an ephemeral
//! port, in-memory persistence, and a mock Google Calendar.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::MockServer;

use rdv_gateway::app_state::AppState;
use rdv_gateway::calendar::{CalendarClient, GoogleCalendarClient};
use rdv_gateway::config::GatewayConfig;
use rdv_gateway::domain::UserId;
use rdv_gateway::persistence::memory::InMemoryPersistence;
use rdv_gateway::server;

/// A running gateway plus handles on its collaborators.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryPersistence>,
    pub calendar: MockServer,
    http: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let calendar = MockServer::start().await;
        let config = GatewayConfig {
            calendar_api_base: calendar.uri(),
            calendar_token_url: format!("{}/token", calendar.uri()),
            google_client_id: Some("client-id".to_string()),
            google_client_secret: Some("client-secret".to_string()),
            calendar_timeout: Duration::from_secs(2),
            ..GatewayConfig::default()
        };

        let Ok(google) = GoogleCalendarClient::from_config(&config) else {
            panic!("calendar client should build");
        };
        let client: Arc<dyn CalendarClient> = Arc::new(google);
        let store = Arc::new(InMemoryPersistence::new());
        let state = AppState::new(Arc::clone(&store), client, &config);
        let app = server::build_app(state);

        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("ephemeral port should bind");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener should have an address");
        };
        tokio::spawn(server::serve(listener, app));

        Self {
            addr,
            store,
            calendar,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Sends a request as `user` (anonymous if `None`) and returns the
    /// status code and JSON body (`Value::Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        user: Option<UserId>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let Ok(response) = builder.send().await else {
            panic!("request to {path} should reach the server");
        };
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let json = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, path: &str, user: UserId) -> (u16, Value) {
        self.request(Method::GET, path, Some(user), None).await
    }

    pub async fn post(&self, path: &str, user: UserId, body: Option<Value>) -> (u16, Value) {
        self.request(Method::POST, path, Some(user), body).await
    }

    /// Creates a pending appointment from `client` to `owner` and returns
    /// its id.
    pub async fn book(&self, client: UserId, owner: UserId) -> String {
        let (status, body) = self
            .post("/rdv", client, Some(booking_body(owner)))
            .await;
        assert_eq!(status, 201, "unexpected create response: {body}");
        let Some(id) = body.get("id").and_then(Value::as_str) else {
            panic!("created appointment should carry an id: {body}");
        };
        id.to_string()
    }

    /// Stores a valid calendar credential for `owner`.
    pub async fn connect_calendar(&self, owner: UserId) {
        let (status, body) = self
            .request(
                Method::PUT,
                "/calendar/credentials",
                Some(owner),
                Some(json!({
                    "access_token": "access-1",
                    "refresh_token": "refresh-1",
                    "expires_in": 3600
                })),
            )
            .await;
        assert_eq!(status, 200, "unexpected connect response: {body}");
    }
}

/// A valid `POST /rdv` body for an appointment two days from now.
pub fn booking_body(owner: UserId) -> Value {
    json!({
        "owner_id": owner,
        "scheduled_at": Utc::now() + ChronoDuration::days(2),
        "kind": "visit",
        "reason": "Viewing the Clio",
        "location": "12 rue de Rivoli, Paris"
    })
}

pub fn error_kind(body: &Value) -> Option<&str> {
    body.get("kind").and_then(Value::as_str)
}
