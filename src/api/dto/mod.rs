//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain entities ([`crate::domain::Appointment`],
//! [`crate::domain::Notification`]) are serialized as-is; DTOs only wrap
//! them or carry request-specific input.

pub mod appointment_dto;
pub mod calendar_dto;
pub mod common_dto;
pub mod notification_dto;

pub use appointment_dto::*;
pub use calendar_dto::*;
pub use common_dto::*;
pub use notification_dto::*;
