//! Private channel authorization for realtime clients.

use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::dto::{ChannelAuthRequest, ChannelAuthResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};
use crate::ws::channel;

/// `POST /broadcasting/auth` — May the caller listen on this channel?
///
/// # Errors
///
/// Returns [`GatewayError::Authorization`] for another user's channel and
/// [`GatewayError::Validation`] for an unknown channel name.
#[utoipa::path(
    post,
    path = "/broadcasting/auth",
    tag = "Realtime",
    summary = "Authorize a private channel",
    description = "Only `notifications.{user_id}` of the caller is authorized.",
    request_body = ChannelAuthRequest,
    responses(
        (status = 200, description = "Channel authorized", body = ChannelAuthResponse),
        (status = 400, description = "Unknown channel", body = ErrorResponse),
        (status = 403, description = "Channel belongs to another user", body = ErrorResponse),
    )
)]
pub async fn authorize_channel(
    AuthUser(caller): AuthUser,
    Json(req): Json<ChannelAuthRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let channel = channel::authorize(caller, &req.channel_name)?;
    Ok(Json(ChannelAuthResponse {
        channel: channel.to_string(),
        authorized: true,
    }))
}

/// Realtime authorization routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/broadcasting/auth", post(authorize_channel))
}
