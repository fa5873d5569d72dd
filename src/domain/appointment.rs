//! Appointment aggregate and its transition graph.
//!
//! ```text
//!   pending ──confirm──▶ confirmed ──complete──▶ completed
//!      │                     │
//!      └──refuse──▶ refused  └──cancel──▶ cancelled
//! ```
//!
//! The graph is encoded once, in [`Transition`]. Services never compare
//! statuses by hand; they ask a transition whether it applies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AppointmentId, UserId, VehicleId};
use crate::error::GatewayError;

/// Maximum length (in characters) of `reason` and `location`.
pub const MAX_SHORT_TEXT_LEN: usize = 255;

/// Maximum length (in characters) of `notes`.
pub const MAX_NOTES_LEN: usize = 2000;

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Requested by the client, awaiting the owner's answer.
    Pending,
    /// Accepted by the owner.
    Confirmed,
    /// Declined by the owner. Terminal.
    Refused,
    /// Called off by either party after confirmation. Terminal.
    Cancelled,
    /// Marked done by the owner. Terminal.
    Completed,
}

impl AppointmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Refused,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Refused => "refused",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Returns `true` for statuses that accept no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Refused | Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| GatewayError::Validation(format!("unknown appointment status: {s}")))
    }
}

/// What the meeting is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    /// Viewing the vehicle in person.
    Visit,
    /// Driving the vehicle.
    TestDrive,
    /// First meeting between buyer and seller.
    FirstContact,
}

impl AppointmentKind {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::TestDrive => "test_drive",
            Self::FirstContact => "first_contact",
        }
    }

    /// Returns the user-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visit => "Visite",
            Self::TestDrive => "Essai routier",
            Self::FirstContact => "Premier contact",
        }
    }
}

impl FromStr for AppointmentKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visit" => Ok(Self::Visit),
            "test_drive" => Ok(Self::TestDrive),
            "first_contact" => Ok(Self::FirstContact),
            other => Err(GatewayError::Validation(format!(
                "unknown appointment kind: {other}"
            ))),
        }
    }
}

/// Which side of the appointment a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The prospective buyer who booked the appointment.
    Client,
    /// The seller who owns the vehicle.
    Owner,
}

/// A status change requested on an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `pending → confirmed`, owner only.
    Confirm,
    /// `pending → refused`, owner only.
    Refuse,
    /// `confirmed → cancelled`, either party.
    Cancel,
    /// `confirmed → completed`, owner only. Not gated on the scheduled time.
    Complete,
}

impl Transition {
    /// Verb used in logs and error messages.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Refuse => "refuse",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }

    /// The only status this transition may start from.
    #[must_use]
    pub const fn from_status(self) -> AppointmentStatus {
        match self {
            Self::Confirm | Self::Refuse => AppointmentStatus::Pending,
            Self::Cancel | Self::Complete => AppointmentStatus::Confirmed,
        }
    }

    /// The status this transition leads to.
    #[must_use]
    pub const fn to_status(self) -> AppointmentStatus {
        match self {
            Self::Confirm => AppointmentStatus::Confirmed,
            Self::Refuse => AppointmentStatus::Refused,
            Self::Cancel => AppointmentStatus::Cancelled,
            Self::Complete => AppointmentStatus::Completed,
        }
    }

    /// Returns `true` if `party` may perform this transition.
    #[must_use]
    pub const fn permits(self, party: Party) -> bool {
        match self {
            Self::Cancel => true,
            Self::Confirm | Self::Refuse | Self::Complete => matches!(party, Party::Owner),
        }
    }

    /// Computes the next status from `current`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidState`] if the transition is not an
    /// edge of the graph from `current`.
    pub fn apply(self, current: AppointmentStatus) -> Result<AppointmentStatus, GatewayError> {
        if current == self.from_status() {
            Ok(self.to_status())
        } else {
            Err(GatewayError::InvalidState {
                action: self.action(),
                from: current,
            })
        }
    }
}

/// A scheduled meeting between a client and a vehicle owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Appointment {
    /// Appointment identifier.
    pub id: AppointmentId,
    /// Buyer who requested the appointment.
    pub client_id: UserId,
    /// Seller who receives the request.
    pub owner_id: UserId,
    /// Vehicle concerned, if any.
    pub vehicle_id: Option<VehicleId>,
    /// Meeting time.
    pub scheduled_at: DateTime<Utc>,
    /// Meeting kind.
    pub kind: AppointmentKind,
    /// Current lifecycle status.
    pub status: AppointmentStatus,
    /// Why the client wants to meet.
    pub reason: String,
    /// Where the meeting takes place.
    pub location: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Event id in the owner's external calendar. Only set while confirmed.
    pub external_calendar_event_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp; deleted appointments are invisible to the API.
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Returns which party `user` is, or `None` for outsiders.
    #[must_use]
    pub fn party_of(&self, user: UserId) -> Option<Party> {
        if user == self.owner_id {
            Some(Party::Owner)
        } else if user == self.client_id {
            Some(Party::Client)
        } else {
            None
        }
    }

    /// Returns the user on the other side of `party`.
    #[must_use]
    pub const fn counter_party(&self, party: Party) -> UserId {
        match party {
            Party::Client => self.owner_id,
            Party::Owner => self.client_id,
        }
    }

    /// Returns `true` once the appointment has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Validated input for a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    /// Booking client.
    pub client_id: UserId,
    /// Vehicle owner.
    pub owner_id: UserId,
    /// Vehicle concerned, if any.
    pub vehicle_id: Option<VehicleId>,
    /// Requested meeting time.
    pub scheduled_at: DateTime<Utc>,
    /// Meeting kind.
    pub kind: AppointmentKind,
    /// Why the client wants to meet.
    pub reason: String,
    /// Meeting place.
    pub location: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Checks the request against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the time is in the past, the
    /// client books with themselves, or a text field is empty or too long.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), GatewayError> {
        if self.scheduled_at <= now {
            return Err(GatewayError::Validation(
                "scheduled_at must be in the future".to_string(),
            ));
        }
        if self.owner_id == self.client_id {
            return Err(GatewayError::Validation(
                "cannot book an appointment with yourself".to_string(),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(GatewayError::Validation("reason is required".to_string()));
        }
        check_len("reason", Some(&self.reason), MAX_SHORT_TEXT_LEN)?;
        check_len("location", self.location.as_deref(), MAX_SHORT_TEXT_LEN)?;
        check_len("notes", self.notes.as_deref(), MAX_NOTES_LEN)
    }

    /// Builds the pending appointment persisted on creation.
    #[must_use]
    pub fn into_pending(self, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            client_id: self.client_id,
            owner_id: self.owner_id,
            vehicle_id: self.vehicle_id,
            scheduled_at: self.scheduled_at,
            kind: self.kind,
            status: AppointmentStatus::Pending,
            reason: self.reason.trim().to_string(),
            location: self.location,
            notes: self.notes,
            external_calendar_event_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), GatewayError> {
    match value {
        Some(v) if v.chars().count() > max => Err(GatewayError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}
