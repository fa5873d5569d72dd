//! Calendar credential handlers: connect, status, disconnect.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::auth::AuthUser;
use crate::api::dto::ConnectCalendarRequest;
use crate::app_state::AppState;
use crate::calendar::CalendarConnection;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /calendar/credentials` — Is the caller's calendar connected?
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/calendar/credentials",
    tag = "Calendar",
    summary = "Calendar connection status",
    responses(
        (status = 200, description = "Connection status", body = CalendarConnection),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn calendar_status(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.calendar.status(caller).await?))
}

/// `PUT /calendar/credentials` — Store the caller's OAuth tokens.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for blank tokens or a non-positive
/// lifetime.
#[utoipa::path(
    put,
    path = "/calendar/credentials",
    tag = "Calendar",
    summary = "Connect a calendar",
    description = "Replaces any stored credential. Confirmed appointments are then mirrored to the caller's primary calendar.",
    request_body = ConnectCalendarRequest,
    responses(
        (status = 200, description = "Calendar connected", body = CalendarConnection),
        (status = 400, description = "Invalid tokens", body = ErrorResponse),
    )
)]
pub async fn connect_calendar(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConnectCalendarRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let credential = req.into_credential(Utc::now())?;
    Ok(Json(state.calendar.connect(caller, credential).await?))
}

/// `DELETE /calendar/credentials` — Forget the caller's OAuth tokens.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    delete,
    path = "/calendar/credentials",
    tag = "Calendar",
    summary = "Disconnect the calendar",
    responses(
        (status = 204, description = "Calendar disconnected"),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn disconnect_calendar(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    state.calendar.disconnect(caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Calendar routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/calendar/credentials",
        get(calendar_status)
            .put(connect_calendar)
            .delete(disconnect_calendar),
    )
}
