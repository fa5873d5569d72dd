//! Request/response DTOs for appointment endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Appointment, AppointmentKind, AppointmentStatus, NewAppointment, Party, UserId, VehicleId,
};
use crate::persistence::AppointmentFilter;

/// `POST /rdv` request body. The client is the authenticated caller.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    /// Owner of the vehicle to meet.
    pub owner_id: UserId,
    /// Vehicle concerned, if any.
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    /// Requested meeting time (RFC 3339).
    pub scheduled_at: DateTime<Utc>,
    /// Meeting kind.
    pub kind: AppointmentKind,
    /// Why the client wants to meet.
    pub reason: String,
    /// Meeting place.
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    /// Binds the request to the authenticated `client`.
    #[must_use]
    pub fn into_new(self, client: UserId) -> NewAppointment {
        NewAppointment {
            client_id: client,
            owner_id: self.owner_id,
            vehicle_id: self.vehicle_id,
            scheduled_at: self.scheduled_at,
            kind: self.kind,
            reason: self.reason,
            location: self.location,
            notes: self.notes,
        }
    }
}

/// `GET /rdv` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct ListAppointmentsQuery {
    /// Only appointments where the caller plays this role.
    pub role: Option<Party>,
    /// Only appointments in this status.
    pub status: Option<AppointmentStatus>,
}

impl From<ListAppointmentsQuery> for AppointmentFilter {
    fn from(query: ListAppointmentsQuery) -> Self {
        Self {
            role: query.role,
            status: query.status,
        }
    }
}

/// `GET /rdv` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentListResponse {
    /// Appointments, latest `scheduled_at` first.
    pub data: Vec<Appointment>,
    /// Number of appointments returned.
    pub total: usize,
}
