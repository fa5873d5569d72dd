//! Database row models and their conversion to domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Appointment, AppointmentKind, AppointmentStatus, CalendarCredential, Notification,
    NotificationType,
};
use crate::error::GatewayError;

/// A row from the `appointments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    /// Primary key.
    pub id: Uuid,
    /// Booking client.
    pub client_id: Uuid,
    /// Vehicle owner.
    pub owner_id: Uuid,
    /// Vehicle concerned, if any.
    pub vehicle_id: Option<Uuid>,
    /// Meeting time.
    pub scheduled_at: DateTime<Utc>,
    /// Kind discriminator (`visit`, `test_drive`, `first_contact`).
    pub kind: String,
    /// Status discriminator.
    pub status: String,
    /// Why the client wants to meet.
    pub reason: String,
    /// Meeting place.
    pub location: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// External calendar event id.
    pub external_calendar_event_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = GatewayError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status: AppointmentStatus = row
            .status
            .parse()
            .map_err(|_| GatewayError::Persistence(format!("corrupt status: {}", row.status)))?;
        let kind: AppointmentKind = row
            .kind
            .parse()
            .map_err(|_| GatewayError::Persistence(format!("corrupt kind: {}", row.kind)))?;

        Ok(Self {
            id: row.id.into(),
            client_id: row.client_id.into(),
            owner_id: row.owner_id.into(),
            vehicle_id: row.vehicle_id.map(Into::into),
            scheduled_at: row.scheduled_at,
            kind,
            status,
            reason: row.reason,
            location: row.location,
            notes: row.notes,
            external_calendar_event_id: row.external_calendar_event_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// A row from the `notifications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    /// Primary key.
    pub id: Uuid,
    /// Recipient user.
    pub recipient_id: Uuid,
    /// Type discriminator.
    #[sqlx(rename = "type")]
    pub notification_type: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// JSONB payload.
    pub payload: serde_json::Value,
    /// Read flag.
    pub is_read: bool,
    /// First read timestamp.
    pub read_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = GatewayError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let notification_type = NotificationType::parse(&row.notification_type).ok_or_else(|| {
            GatewayError::Persistence(format!(
                "corrupt notification type: {}",
                row.notification_type
            ))
        })?;

        Ok(Self {
            id: row.id.into(),
            recipient_id: row.recipient_id.into(),
            notification_type,
            title: row.title,
            message: row.message,
            payload: row.payload,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

/// A row from the `calendar_credentials` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
}

impl From<CredentialRow> for CalendarCredential {
    fn from(row: CredentialRow) -> Self {
        Self {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
        }
    }
}
