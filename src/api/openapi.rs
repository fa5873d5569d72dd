//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    AppointmentListResponse, ChannelAuthRequest, ChannelAuthResponse, ConnectCalendarRequest,
    CreateAppointmentRequest, MarkAllReadResponse, NotificationListResponse, PaginationMeta,
    UnreadCountResponse,
};
use super::handlers::{appointment, broadcasting, calendar, notification, system};
use crate::calendar::CalendarConnection;
use crate::domain::{
    Appointment, AppointmentKind, AppointmentStatus, Notification, NotificationType, Party,
};
use crate::error::ErrorResponse;

/// Generated OpenAPI specification, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "rdv-gateway",
        description = "Appointments between vehicle buyers and sellers, with calendar sync and realtime notifications. Every endpoint except `/health` expects the authenticated user id in the `X-User-Id` header."
    ),
    paths(
        appointment::create_appointment,
        appointment::list_appointments,
        appointment::get_appointment,
        appointment::delete_appointment,
        appointment::confirm_appointment,
        appointment::refuse_appointment,
        appointment::cancel_appointment,
        appointment::complete_appointment,
        notification::list_notifications,
        notification::unread_count,
        notification::mark_read,
        notification::mark_all_read,
        calendar::calendar_status,
        calendar::connect_calendar,
        calendar::disconnect_calendar,
        broadcasting::authorize_channel,
        system::health_handler,
    ),
    components(schemas(
        Appointment,
        AppointmentKind,
        AppointmentStatus,
        Party,
        Notification,
        NotificationType,
        CreateAppointmentRequest,
        AppointmentListResponse,
        NotificationListResponse,
        PaginationMeta,
        UnreadCountResponse,
        MarkAllReadResponse,
        ConnectCalendarRequest,
        CalendarConnection,
        ChannelAuthRequest,
        ChannelAuthResponse,
        ErrorResponse,
        system::HealthResponse,
    )),
    tags(
        (name = "Appointments", description = "Appointment lifecycle"),
        (name = "Notifications", description = "Notification inbox"),
        (name = "Calendar", description = "External calendar connection"),
        (name = "Realtime", description = "Private channel authorization"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;
