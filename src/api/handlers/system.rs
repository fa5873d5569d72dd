//! Liveness probe.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// `GET /health` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Server clock.
    pub server_time: DateTime<Utc>,
    /// Crate version.
    pub version: &'static str,
    /// Users currently listening on their realtime channel.
    pub live_channels: usize,
}

/// `GET /health` — Liveness and realtime load.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        server_time: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        live_channels: state.broadcaster.channel_count().await,
    })
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
