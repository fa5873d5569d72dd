//! Service layer: business logic orchestration.
//!
//! [`AppointmentService`] owns the appointment state machine and drives its
//! side effects; [`NotificationDispatcher`] stores notifications and pushes
//! them to the recipient's realtime channel.

pub mod appointment_service;
pub mod notification_dispatcher;

pub use appointment_service::AppointmentService;
pub use notification_dispatcher::NotificationDispatcher;
