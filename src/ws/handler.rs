//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::api::auth::AuthUser;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade an authenticated HTTP connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let broadcaster = Arc::clone(&state.broadcaster);
    tracing::debug!(user_id = %user, "ws upgrade");

    ws.on_upgrade(move |socket| run_connection(socket, user, broadcaster))
}
