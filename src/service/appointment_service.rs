//! Appointment service: the RDV state machine and its side effects.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::calendar::CalendarSync;
use crate::domain::{
    Appointment, AppointmentId, NewAppointment, NewNotification, Party, Transition, UserId,
};
use crate::error::GatewayError;
use crate::persistence::{AppointmentFilter, AppointmentStore, StatusChange, UserDirectory};

use super::NotificationDispatcher;

/// Orchestration layer for every appointment operation.
///
/// A transition runs in two phases. First the status change is validated and
/// committed with a compare-and-swap on the stored status:
///
/// load (`NotFound`) → authorize (`Authorization`) → legal edge
/// (`InvalidState`) → conditional write (`Conflict` on a lost race).
///
/// Only after the commit do the side effects run, in order: calendar sync,
/// then the notification to the counter-party. Neither can fail the call or
/// undo the transition.
#[derive(Debug, Clone)]
pub struct AppointmentService {
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn UserDirectory>,
    calendar: CalendarSync,
    notifications: NotificationDispatcher,
    time_zone: Tz,
}

impl AppointmentService {
    /// Creates a new `AppointmentService`.
    #[must_use]
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn UserDirectory>,
        calendar: CalendarSync,
        notifications: NotificationDispatcher,
        time_zone: Tz,
    ) -> Self {
        Self {
            appointments,
            directory,
            calendar,
            notifications,
            time_zone,
        }
    }

    /// Books a new pending appointment and notifies the owner.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the time is in the past, the
    /// client books themselves, or a text field is empty or too long.
    pub async fn create(&self, request: NewAppointment) -> Result<Appointment, GatewayError> {
        let now = Utc::now();
        request.validate(now)?;
        let appointment = request.into_pending(now);
        self.appointments.insert(&appointment).await?;

        tracing::info!(
            appointment_id = %appointment.id,
            client_id = %appointment.client_id,
            owner_id = %appointment.owner_id,
            kind = appointment.kind.as_str(),
            "appointment requested"
        );

        self.notify(&appointment, appointment.owner_id, appointment.client_id)
            .await;
        Ok(appointment)
    }

    /// `pending → confirmed`, owner only. Creates the calendar event.
    ///
    /// # Errors
    ///
    /// See [`AppointmentService`] for the check order.
    pub async fn confirm(
        &self,
        caller: UserId,
        id: AppointmentId,
    ) -> Result<Appointment, GatewayError> {
        self.transition(caller, id, Transition::Confirm).await
    }

    /// `pending → refused`, owner only.
    ///
    /// # Errors
    ///
    /// See [`AppointmentService`] for the check order.
    pub async fn refuse(
        &self,
        caller: UserId,
        id: AppointmentId,
    ) -> Result<Appointment, GatewayError> {
        self.transition(caller, id, Transition::Refuse).await
    }

    /// `confirmed → cancelled`, either party. Deletes the calendar event.
    ///
    /// # Errors
    ///
    /// See [`AppointmentService`] for the check order.
    pub async fn cancel(
        &self,
        caller: UserId,
        id: AppointmentId,
    ) -> Result<Appointment, GatewayError> {
        self.transition(caller, id, Transition::Cancel).await
    }

    /// `confirmed → completed`, owner only, at any time.
    ///
    /// # Errors
    ///
    /// See [`AppointmentService`] for the check order.
    pub async fn complete(
        &self,
        caller: UserId,
        id: AppointmentId,
    ) -> Result<Appointment, GatewayError> {
        self.transition(caller, id, Transition::Complete).await
    }

    /// Loads an appointment visible to `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for unknown or deleted ids and
    /// [`GatewayError::Authorization`] if `caller` is not a party.
    pub async fn get(&self, caller: UserId, id: AppointmentId) -> Result<Appointment, GatewayError> {
        let appointment = self.load(id).await?;
        party_of(&appointment, caller)?;
        Ok(appointment)
    }

    /// Lists the caller's appointments, latest `scheduled_at` first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    pub async fn list(
        &self,
        caller: UserId,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, GatewayError> {
        self.appointments.list_for_user(caller, filter).await
    }

    /// Hides a finished appointment from both parties.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`], [`GatewayError::Authorization`],
    /// or [`GatewayError::InvalidState`] if the appointment is not terminal.
    pub async fn soft_delete(&self, caller: UserId, id: AppointmentId) -> Result<(), GatewayError> {
        let appointment = self.load(id).await?;
        party_of(&appointment, caller)?;
        if !appointment.status.is_terminal() {
            return Err(GatewayError::InvalidState {
                action: "delete",
                from: appointment.status,
            });
        }
        if !self.appointments.soft_delete(id, Utc::now()).await? {
            return Err(GatewayError::NotFound("appointment"));
        }
        tracing::info!(appointment_id = %id, user_id = %caller, "appointment deleted");
        Ok(())
    }

    async fn load(&self, id: AppointmentId) -> Result<Appointment, GatewayError> {
        self.appointments
            .get(id)
            .await?
            .ok_or(GatewayError::NotFound("appointment"))
    }

    async fn transition(
        &self,
        caller: UserId,
        id: AppointmentId,
        transition: Transition,
    ) -> Result<Appointment, GatewayError> {
        let current = self.load(id).await?;

        let party = party_of(&current, caller)?;
        if !transition.permits(party) {
            return Err(GatewayError::Authorization(format!(
                "only the owner may {} an appointment",
                transition.action()
            )));
        }

        let next = transition.apply(current.status)?;
        let StatusChange {
            appointment: updated,
            cleared_event_id,
        } = self
            .appointments
            .compare_and_set_status(id, current.status, next, Utc::now())
            .await?
            .ok_or(GatewayError::Conflict {
                expected: current.status,
            })?;

        tracing::info!(
            appointment_id = %id,
            user_id = %caller,
            from = %current.status,
            to = %updated.status,
            "appointment {}",
            transition.action()
        );

        let updated = self
            .sync_calendar(updated, cleared_event_id, transition)
            .await;
        self.notify(&updated, current.counter_party(party), caller)
            .await;
        Ok(updated)
    }

    /// `cleared_event_id` is the event id the status write removed, which
    /// may have been recorded after `current` was loaded.
    async fn sync_calendar(
        &self,
        mut after: Appointment,
        cleared_event_id: Option<String>,
        transition: Transition,
    ) -> Appointment {
        match transition {
            Transition::Confirm => {
                let attendee = match self.directory.email(after.client_id).await {
                    Ok(email) => email,
                    Err(e) => {
                        tracing::warn!(user_id = %after.client_id, error = %e, "attendee lookup failed");
                        None
                    }
                };
                let Some(draft) = self.calendar.draft(&after, attendee) else {
                    tracing::warn!(
                        appointment_id = %after.id,
                        scheduled_at = %after.scheduled_at,
                        "calendar event end out of range, sync skipped"
                    );
                    return after;
                };
                let Some(event_id) = self.calendar.create_event(after.owner_id, &draft).await else {
                    return after;
                };
                match self.appointments.set_calendar_event_id(after.id, &event_id).await {
                    Ok(true) => after.external_calendar_event_id = Some(event_id),
                    Ok(false) => {
                        // Cancelled while the event was being created.
                        tracing::info!(
                            appointment_id = %after.id,
                            %event_id,
                            "appointment left confirmed, removing orphan calendar event"
                        );
                        self.calendar.delete_event(after.owner_id, &event_id).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            appointment_id = %after.id,
                            %event_id,
                            error = %e,
                            "failed to record calendar event id"
                        );
                    }
                }
            }
            Transition::Cancel => {
                if let Some(event_id) = cleared_event_id {
                    self.calendar.delete_event(after.owner_id, &event_id).await;
                }
            }
            Transition::Refuse | Transition::Complete => {}
        }
        after
    }

    async fn notify(&self, appointment: &Appointment, recipient: UserId, actor: UserId) {
        let notification =
            NewNotification::for_appointment(appointment, recipient, actor, self.time_zone);
        if let Err(e) = self.notifications.record(notification).await {
            tracing::warn!(
                appointment_id = %appointment.id,
                user_id = %recipient,
                error = %e,
                "failed to record notification"
            );
        }
    }
}

fn party_of(appointment: &Appointment, caller: UserId) -> Result<Party, GatewayError> {
    appointment.party_of(caller).ok_or_else(|| {
        GatewayError::Authorization("not a party to this appointment".to_string())
    })
}
