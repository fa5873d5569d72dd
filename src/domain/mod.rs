//! Domain layer: identifiers, the appointment state machine, notifications
//! and calendar credentials.
//!
//! Nothing in here performs I/O. Persistence, calendar calls and realtime
//! delivery live in their own layers and consume these types.

pub mod appointment;
pub mod credential;
pub mod ids;
pub mod notification;

pub use appointment::{
    Appointment, AppointmentKind, AppointmentStatus, NewAppointment, Party, Transition,
};
pub use credential::{CalendarCredential, TokenGrant, expiry_after};
pub use ids::{AppointmentId, NotificationId, UserId, VehicleId};
pub use notification::{ChannelEvent, NewNotification, Notification, NotificationType};
