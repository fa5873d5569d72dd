//! Appointment handlers: booking, the status transitions, reads and delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::parse_id;
use crate::api::auth::AuthUser;
use crate::api::dto::{AppointmentListResponse, CreateAppointmentRequest, ListAppointmentsQuery};
use crate::app_state::AppState;
use crate::domain::{Appointment, AppointmentId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rdv` — Request an appointment with a vehicle owner.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for a past time, self-booking or
/// malformed text fields.
#[utoipa::path(
    post,
    path = "/rdv",
    tag = "Appointments",
    summary = "Request an appointment",
    description = "Creates a pending appointment between the authenticated client and a vehicle owner. The owner is notified.",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment created", body = Appointment),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn create_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let appointment = state.appointments.create(req.into_new(caller)).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `GET /rdv` — List the caller's appointments.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/rdv",
    tag = "Appointments",
    summary = "List appointments",
    description = "Returns the appointments where the caller is client or owner, latest first. Filter with `role` and `status`.",
    params(ListAppointmentsQuery),
    responses(
        (status = 200, description = "Appointment list", body = AppointmentListResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn list_appointments(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let data = state.appointments.list(caller, query.into()).await?;
    Ok(Json(AppointmentListResponse {
        total: data.len(),
        data,
    }))
}

/// `GET /rdv/{id}` — Get one appointment.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] or [`GatewayError::Authorization`].
#[utoipa::path(
    get,
    path = "/rdv/{id}",
    tag = "Appointments",
    summary = "Get an appointment",
    params(("id" = uuid::Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
    )
)]
pub async fn get_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(state.appointments.get(caller, id).await?))
}

/// `DELETE /rdv/{id}` — Soft-delete a finished appointment.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidState`] unless the appointment is refused,
/// cancelled or completed.
#[utoipa::path(
    delete,
    path = "/rdv/{id}",
    tag = "Appointments",
    summary = "Delete an appointment",
    description = "Hides a refused, cancelled or completed appointment from both parties.",
    params(("id" = uuid::Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Appointment is still active", body = ErrorResponse),
    )
)]
pub async fn delete_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    state.appointments.soft_delete(caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /rdv/{id}/confirmer` — Owner confirms a pending appointment.
///
/// # Errors
///
/// Returns [`GatewayError`] per the transition check order.
#[utoipa::path(
    post,
    path = "/rdv/{id}/confirmer",
    tag = "Appointments",
    summary = "Confirm an appointment",
    description = "pending → confirmed. Owner only. A calendar event is created on a best-effort basis.",
    params(("id" = uuid::Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment confirmed", body = Appointment),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Not pending, or modified concurrently", body = ErrorResponse),
    )
)]
pub async fn confirm_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(state.appointments.confirm(caller, id).await?))
}

/// `POST /rdv/{id}/refuser` — Owner refuses a pending appointment.
///
/// # Errors
///
/// Returns [`GatewayError`] per the transition check order.
#[utoipa::path(
    post,
    path = "/rdv/{id}/refuser",
    tag = "Appointments",
    summary = "Refuse an appointment",
    description = "pending → refused. Owner only.",
    params(("id" = uuid::Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment refused", body = Appointment),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Not pending, or modified concurrently", body = ErrorResponse),
    )
)]
pub async fn refuse_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(state.appointments.refuse(caller, id).await?))
}

/// `POST /rdv/{id}/annuler` — Either party cancels a confirmed appointment.
///
/// # Errors
///
/// Returns [`GatewayError`] per the transition check order.
#[utoipa::path(
    post,
    path = "/rdv/{id}/annuler",
    tag = "Appointments",
    summary = "Cancel an appointment",
    description = "confirmed → cancelled. Client or owner. The calendar event is deleted on a best-effort basis.",
    params(("id" = uuid::Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment cancelled", body = Appointment),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Not confirmed, or modified concurrently", body = ErrorResponse),
    )
)]
pub async fn cancel_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(state.appointments.cancel(caller, id).await?))
}

/// `POST /rdv/{id}/terminer` — Owner marks a confirmed appointment as done.
///
/// # Errors
///
/// Returns [`GatewayError`] per the transition check order.
#[utoipa::path(
    post,
    path = "/rdv/{id}/terminer",
    tag = "Appointments",
    summary = "Complete an appointment",
    description = "confirmed → completed. Owner only, not gated on the scheduled time.",
    params(("id" = uuid::Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment completed", body = Appointment),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Not confirmed, or modified concurrently", body = ErrorResponse),
    )
)]
pub async fn complete_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(state.appointments.complete(caller, id).await?))
}

/// Appointment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rdv", post(create_appointment).get(list_appointments))
        .route("/rdv/{id}", get(get_appointment).delete(delete_appointment))
        .route("/rdv/{id}/confirmer", post(confirm_appointment))
        .route("/rdv/{id}/refuser", post(refuse_appointment))
        .route("/rdv/{id}/annuler", post(cancel_appointment))
        .route("/rdv/{id}/terminer", post(complete_appointment))
}
