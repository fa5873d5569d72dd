//! Persistence layer: appointment, notification and credential storage.
//!
//! Each concern is a trait so that services depend on behavior, not on a
//! database. Two implementations ship with the crate:
//!
//! - [`postgres::PostgresPersistence`] backed by `sqlx::PgPool`;
//! - [`memory::InMemoryPersistence`] backed by `tokio::sync::RwLock` maps,
//!   used in tests and when `PERSISTENCE_ENABLED=false`.
//!
//! Both honor the same compare-and-swap contract on the appointment status.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Appointment, AppointmentId, AppointmentStatus, CalendarCredential, Notification,
    NotificationId, Party, UserId,
};
use crate::error::GatewayError;

/// Filter for [`AppointmentStore::list_for_user`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentFilter {
    /// Restrict to appointments where the user plays this role.
    pub role: Option<Party>,
    /// Restrict to a single status.
    pub status: Option<AppointmentStatus>,
}

/// One page of notifications plus the total matching count.
#[derive(Debug, Clone)]
pub struct NotificationPage {
    /// Notifications on this page, newest first.
    pub items: Vec<Notification>,
    /// Total number of notifications matching the query.
    pub total: u64,
}

/// Outcome of a winning [`AppointmentStore::compare_and_set_status`].
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The row as written.
    pub appointment: Appointment,
    /// Calendar event id the write removed from the row, read under the
    /// same lock as the status change.
    pub cleared_event_id: Option<String>,
}

/// Durable storage of appointments.
#[async_trait]
pub trait AppointmentStore: Send + Sync + std::fmt::Debug {
    /// Inserts a freshly created appointment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn insert(&self, appointment: &Appointment) -> Result<(), GatewayError>;

    /// Loads an appointment that has not been soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, GatewayError>;

    /// Lists the non-deleted appointments involving `user`, latest
    /// `scheduled_at` first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn list_for_user(
        &self,
        user: UserId,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, GatewayError>;

    /// Atomically moves the appointment from `expected` to `next`.
    ///
    /// The write only happens if the persisted status still equals
    /// `expected`. Leaving `confirmed` clears the calendar event id in the
    /// same write and reports the cleared id. Returns `None` if the guard
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn compare_and_set_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, GatewayError>;

    /// Records the external calendar event id, only while the appointment is
    /// still confirmed. Returns `false` if it moved on in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn set_calendar_event_id(
        &self,
        id: AppointmentId,
        event_id: &str,
    ) -> Result<bool, GatewayError>;

    /// Soft-deletes an appointment sitting in a terminal status. Returns
    /// `false` if it is missing, already deleted or not terminal.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn soft_delete(&self, id: AppointmentId, now: DateTime<Utc>)
    -> Result<bool, GatewayError>;
}

/// Durable storage of notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug {
    /// Persists a new notification.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn insert(&self, notification: &Notification) -> Result<(), GatewayError>;

    /// Returns one page of a recipient's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn list(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<NotificationPage, GatewayError>;

    /// Counts a recipient's unread notifications.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn unread_count(&self, recipient: UserId) -> Result<u64, GatewayError>;

    /// Marks one notification as read. `read_at` is only set the first time.
    /// Returns `None` if the notification does not belong to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, GatewayError>;

    /// Marks every unread notification of `recipient` as read and returns how
    /// many rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn mark_all_read(&self, recipient: UserId, now: DateTime<Utc>)
    -> Result<u64, GatewayError>;
}

/// Storage of per-user calendar credentials. Values are replaced whole.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Loads a user's credential, if the calendar is connected.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn get(&self, user: UserId) -> Result<Option<CalendarCredential>, GatewayError>;

    /// Stores `credential`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn put(&self, user: UserId, credential: &CalendarCredential)
    -> Result<(), GatewayError>;

    /// Removes a user's credential. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn remove(&self, user: UserId) -> Result<bool, GatewayError>;
}

/// Read-only view over the externally owned user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Returns the contact email of `user`, if known.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn email(&self, user: UserId) -> Result<Option<String>, GatewayError>;
}
