//! Persisted notifications and the realtime events that carry them.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::appointment::{Appointment, AppointmentStatus};
use super::{NotificationId, UserId};

/// Notification type discriminator, stored in the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// A client requested a new appointment.
    RdvRequested,
    /// The owner accepted the appointment.
    RdvConfirmed,
    /// The owner declined the appointment.
    RdvRefused,
    /// One party cancelled a confirmed appointment.
    RdvCancelled,
    /// The owner marked the appointment as done.
    RdvCompleted,
}

impl NotificationType {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RdvRequested => "rdv_requested",
            Self::RdvConfirmed => "rdv_confirmed",
            Self::RdvRefused => "rdv_refused",
            Self::RdvCancelled => "rdv_cancelled",
            Self::RdvCompleted => "rdv_completed",
        }
    }

    /// Parses the persisted representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::RdvRequested,
            Self::RdvConfirmed,
            Self::RdvRefused,
            Self::RdvCancelled,
            Self::RdvCompleted,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
    }

    /// Notification type announcing that an appointment reached `status`.
    #[must_use]
    pub const fn for_status(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Pending => Self::RdvRequested,
            AppointmentStatus::Confirmed => Self::RdvConfirmed,
            AppointmentStatus::Refused => Self::RdvRefused,
            AppointmentStatus::Cancelled => Self::RdvCancelled,
            AppointmentStatus::Completed => Self::RdvCompleted,
        }
    }

    /// User-facing title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::RdvRequested => "Nouvelle demande de rendez-vous",
            Self::RdvConfirmed => "Rendez-vous confirmé",
            Self::RdvRefused => "Rendez-vous refusé",
            Self::RdvCancelled => "Rendez-vous annulé",
            Self::RdvCompleted => "Rendez-vous terminé",
        }
    }
}

/// A notification row, as persisted and as served to its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// User the notification is addressed to.
    pub recipient_id: UserId,
    /// Type discriminator.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Structured payload referencing the appointment.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// When it was first read.
    pub read_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::service::NotificationDispatcher::record`].
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// Recipient.
    pub recipient_id: UserId,
    /// Type discriminator.
    pub notification_type: NotificationType,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Structured payload.
    pub payload: serde_json::Value,
}

impl NewNotification {
    /// Describes `appointment` having just reached its current status,
    /// addressed to `recipient` and caused by `actor`. Times in the message
    /// are rendered in the operating time zone `tz`.
    #[must_use]
    pub fn for_appointment(
        appointment: &Appointment,
        recipient: UserId,
        actor: UserId,
        tz: Tz,
    ) -> Self {
        let notification_type = NotificationType::for_status(appointment.status);
        let when = appointment
            .scheduled_at
            .with_timezone(&tz)
            .format("%d/%m/%Y à %H:%M");
        let kind = appointment.kind.label().to_lowercase();
        let message = match notification_type {
            NotificationType::RdvRequested => {
                format!("Nouvelle demande ({kind}) pour le {when} : {}", appointment.reason)
            }
            NotificationType::RdvConfirmed => {
                format!("Votre rendez-vous ({kind}) du {when} est confirmé.")
            }
            NotificationType::RdvRefused => {
                format!("Votre demande de rendez-vous ({kind}) du {when} a été refusée.")
            }
            NotificationType::RdvCancelled => {
                format!("Le rendez-vous ({kind}) du {when} a été annulé.")
            }
            NotificationType::RdvCompleted => {
                format!("Le rendez-vous ({kind}) du {when} est terminé.")
            }
        };

        Self {
            recipient_id: recipient,
            notification_type,
            title: notification_type.title().to_string(),
            message,
            payload: serde_json::json!({
                "appointment_id": appointment.id,
                "status": appointment.status,
                "scheduled_at": appointment.scheduled_at,
                "actor_id": actor,
            }),
        }
    }

    /// Materializes the row with a fresh id, unread.
    #[must_use]
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient_id: self.recipient_id,
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            payload: self.payload,
            is_read: false,
            read_at: None,
            created_at: now,
        }
    }
}

/// Event pushed over a user's private realtime channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ChannelEvent {
    /// A notification was just persisted for the channel owner.
    #[serde(rename = "notification.new")]
    NotificationNew {
        /// The persisted notification.
        notification: Notification,
    },
}

impl ChannelEvent {
    /// Returns the wire event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NotificationNew { .. } => "notification.new",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::appointment::{AppointmentKind, NewAppointment};

    fn confirmed_appointment() -> Appointment {
        let now = Utc::now();
        let mut appointment = NewAppointment {
            client_id: UserId::new(),
            owner_id: UserId::new(),
            vehicle_id: None,
            scheduled_at: now + Duration::days(1),
            kind: AppointmentKind::TestDrive,
            reason: "Essai".to_string(),
            location: None,
            notes: None,
        }
        .into_pending(now);
        appointment.status = AppointmentStatus::Confirmed;
        appointment
    }

    #[test]
    fn payload_references_the_appointment() {
        let appointment = confirmed_appointment();
        let new = NewNotification::for_appointment(
            &appointment,
            appointment.client_id,
            appointment.owner_id,
            chrono_tz::Europe::Paris,
        );
        assert_eq!(new.notification_type, NotificationType::RdvConfirmed);
        assert_eq!(
            new.payload.get("appointment_id"),
            Some(&serde_json::json!(appointment.id))
        );
        assert_eq!(new.payload.get("status"), Some(&serde_json::json!("confirmed")));
    }

    #[test]
    fn type_round_trips_through_storage_form() {
        for status in AppointmentStatus::ALL {
            let t = NotificationType::for_status(status);
            assert_eq!(NotificationType::parse(t.as_str()), Some(t));
        }
        assert_eq!(NotificationType::parse("unknown"), None);
    }

    #[test]
    fn channel_event_wire_shape() {
        let appointment = confirmed_appointment();
        let notification = NewNotification::for_appointment(
            &appointment,
            appointment.client_id,
            appointment.owner_id,
            chrono_tz::UTC,
        )
        .into_notification(Utc::now());
        let event = ChannelEvent::NotificationNew { notification };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json.get("event"), Some(&serde_json::json!("notification.new")));
        assert!(json.get("data").and_then(|d| d.get("notification")).is_some());
        assert_eq!(event.name(), "notification.new");
    }
}
