//! In-memory persistence with the same guarantees as the PostgreSQL layer.
//!
//! Every map sits behind its own [`tokio::sync::RwLock`]. The status
//! compare-and-swap runs entirely under the appointments write lock, which
//! makes it atomic with respect to every other writer.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AppointmentFilter, AppointmentStore, CredentialStore, NotificationPage, NotificationStore,
    StatusChange, UserDirectory,
};
use crate::domain::{
    Appointment, AppointmentId, AppointmentStatus, CalendarCredential, Notification,
    NotificationId, Party, UserId,
};
use crate::error::GatewayError;

/// Process-local store implementing every persistence trait.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
    notifications: RwLock<Vec<Notification>>,
    credentials: RwLock<HashMap<UserId, CalendarCredential>>,
    emails: RwLock<HashMap<UserId, String>>,
}

impl InMemoryPersistence {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the contact email returned by [`UserDirectory::email`].
    pub async fn register_email(&self, user: UserId, email: impl Into<String>) {
        self.emails.write().await.insert(user, email.into());
    }

    /// Returns the number of notifications stored for `recipient`.
    pub async fn notification_count(&self, recipient: UserId) -> usize {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.recipient_id == recipient)
            .count()
    }

    /// Loads an appointment including soft-deleted ones.
    pub async fn get_raw(&self, id: AppointmentId) -> Option<Appointment> {
        self.appointments.read().await.get(&id).cloned()
    }
}

fn matches_filter(appointment: &Appointment, user: UserId, filter: AppointmentFilter) -> bool {
    let role_ok = match filter.role {
        Some(Party::Client) => appointment.client_id == user,
        Some(Party::Owner) => appointment.owner_id == user,
        None => appointment.client_id == user || appointment.owner_id == user,
    };
    let status_ok = filter.status.is_none_or(|s| s == appointment.status);
    role_ok && status_ok && !appointment.is_deleted()
}

#[async_trait]
impl AppointmentStore for InMemoryPersistence {
    async fn insert(&self, appointment: &Appointment) -> Result<(), GatewayError> {
        let mut map = self.appointments.write().await;
        if map.contains_key(&appointment.id) {
            return Err(GatewayError::Persistence(format!(
                "appointment {} already exists",
                appointment.id
            )));
        }
        map.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, GatewayError> {
        let map = self.appointments.read().await;
        Ok(map.get(&id).filter(|a| !a.is_deleted()).cloned())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, GatewayError> {
        let map = self.appointments.read().await;
        let mut found: Vec<Appointment> = map
            .values()
            .filter(|a| matches_filter(a, user, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(found)
    }

    async fn compare_and_set_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, GatewayError> {
        let mut map = self.appointments.write().await;
        let Some(appointment) = map.get_mut(&id) else {
            return Ok(None);
        };
        if appointment.is_deleted() || appointment.status != expected {
            return Ok(None);
        }
        appointment.status = next;
        appointment.updated_at = now;
        let cleared_event_id = if next == AppointmentStatus::Confirmed {
            None
        } else {
            appointment.external_calendar_event_id.take()
        };
        Ok(Some(StatusChange {
            appointment: appointment.clone(),
            cleared_event_id,
        }))
    }

    async fn set_calendar_event_id(
        &self,
        id: AppointmentId,
        event_id: &str,
    ) -> Result<bool, GatewayError> {
        let mut map = self.appointments.write().await;
        match map.get_mut(&id) {
            Some(a) if a.status == AppointmentStatus::Confirmed && !a.is_deleted() => {
                a.external_calendar_event_id = Some(event_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(
        &self,
        id: AppointmentId,
        now: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        let mut map = self.appointments.write().await;
        match map.get_mut(&id) {
            Some(a) if a.status.is_terminal() && !a.is_deleted() => {
                a.deleted_at = Some(now);
                a.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl NotificationStore for InMemoryPersistence {
    async fn insert(&self, notification: &Notification) -> Result<(), GatewayError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<NotificationPage, GatewayError> {
        let all = self.notifications.read().await;
        // Reversed so equal timestamps still list the latest insert first.
        let mut matching: Vec<&Notification> = all
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient && (!unread_only || !n.is_read))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(NotificationPage { items, total })
    }

    async fn unread_count(&self, recipient: UserId) -> Result<u64, GatewayError> {
        let all = self.notifications.read().await;
        Ok(all
            .iter()
            .filter(|n| n.recipient_id == recipient && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, GatewayError> {
        let mut all = self.notifications.write().await;
        let Some(notification) = all
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient)
        else {
            return Ok(None);
        };
        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(now);
        }
        Ok(Some(notification.clone()))
    }

    async fn mark_all_read(
        &self,
        recipient: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, GatewayError> {
        let mut all = self.notifications.write().await;
        let mut changed = 0u64;
        for n in all
            .iter_mut()
            .filter(|n| n.recipient_id == recipient && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now);
            changed = changed.saturating_add(1);
        }
        Ok(changed)
    }
}

#[async_trait]
impl CredentialStore for InMemoryPersistence {
    async fn get(&self, user: UserId) -> Result<Option<CalendarCredential>, GatewayError> {
        Ok(self.credentials.read().await.get(&user).cloned())
    }

    async fn put(
        &self,
        user: UserId,
        credential: &CalendarCredential,
    ) -> Result<(), GatewayError> {
        self.credentials
            .write()
            .await
            .insert(user, credential.clone());
        Ok(())
    }

    async fn remove(&self, user: UserId) -> Result<bool, GatewayError> {
        Ok(self.credentials.write().await.remove(&user).is_some())
    }
}

#[async_trait]
impl UserDirectory for InMemoryPersistence {
    async fn email(&self, user: UserId) -> Result<Option<String>, GatewayError> {
        Ok(self.emails.read().await.get(&user).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::domain::{AppointmentKind, NewAppointment, NewNotification};

    fn pending(client: UserId, owner: UserId) -> Appointment {
        let now = Utc::now();
        NewAppointment {
            client_id: client,
            owner_id: owner,
            vehicle_id: None,
            scheduled_at: now + Duration::days(2),
            kind: AppointmentKind::FirstContact,
            reason: "Prise de contact".to_string(),
            location: Some("Lyon".to_string()),
            notes: None,
        }
        .into_pending(now)
    }

    fn notification_for(recipient: UserId) -> Notification {
        let owner = UserId::new();
        let appointment = pending(recipient, owner);
        NewNotification::for_appointment(&appointment, recipient, owner, chrono_tz::UTC)
            .into_notification(Utc::now())
    }

    #[tokio::test]
    async fn compare_and_set_only_succeeds_from_expected_status() {
        let store = InMemoryPersistence::new();
        let appointment = pending(UserId::new(), UserId::new());
        let id = appointment.id;
        let _ = AppointmentStore::insert(&store, &appointment).await;

        let now = Utc::now();
        let first = store
            .compare_and_set_status(id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, now)
            .await;
        let Ok(Some(change)) = first else {
            panic!("first CAS should win");
        };
        assert_eq!(change.appointment.status, AppointmentStatus::Confirmed);
        assert!(change.cleared_event_id.is_none());

        let second = store
            .compare_and_set_status(id, AppointmentStatus::Pending, AppointmentStatus::Refused, now)
            .await;
        assert!(matches!(second, Ok(None)));
    }

    #[tokio::test]
    async fn concurrent_cas_has_a_single_winner() {
        let store = Arc::new(InMemoryPersistence::new());
        let appointment = pending(UserId::new(), UserId::new());
        let id = appointment.id;
        let _ = AppointmentStore::insert(store.as_ref(), &appointment).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .compare_and_set_status(
                        id,
                        AppointmentStatus::Pending,
                        AppointmentStatus::Confirmed,
                        Utc::now(),
                    )
                    .await
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if let Ok(Ok(Some(_))) = handle.await {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn leaving_confirmed_clears_calendar_event() {
        let store = InMemoryPersistence::new();
        let appointment = pending(UserId::new(), UserId::new());
        let id = appointment.id;
        let _ = AppointmentStore::insert(&store, &appointment).await;
        let now = Utc::now();

        // Not confirmed yet: the id must not stick.
        assert!(matches!(store.set_calendar_event_id(id, "evt-1").await, Ok(false)));

        let _ = store
            .compare_and_set_status(id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, now)
            .await;
        assert!(matches!(store.set_calendar_event_id(id, "evt-1").await, Ok(true)));

        let Ok(Some(cancelled)) = store
            .compare_and_set_status(id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled, now)
            .await
        else {
            panic!("cancel CAS should win");
        };
        assert!(cancelled.appointment.external_calendar_event_id.is_none());
        assert_eq!(cancelled.cleared_event_id.as_deref(), Some("evt-1"));
    }

    #[tokio::test]
    async fn soft_delete_requires_terminal_status_and_hides_row() {
        let store = InMemoryPersistence::new();
        let appointment = pending(UserId::new(), UserId::new());
        let id = appointment.id;
        let _ = AppointmentStore::insert(&store, &appointment).await;
        let now = Utc::now();

        assert!(matches!(store.soft_delete(id, now).await, Ok(false)));
        let _ = store
            .compare_and_set_status(id, AppointmentStatus::Pending, AppointmentStatus::Refused, now)
            .await;
        assert!(matches!(store.soft_delete(id, now).await, Ok(true)));
        assert!(matches!(AppointmentStore::get(&store, id).await, Ok(None)));
        assert!(store.get_raw(id).await.is_some());
    }

    #[tokio::test]
    async fn list_filters_by_role_and_status() {
        let store = InMemoryPersistence::new();
        let user = UserId::new();
        let as_client = pending(user, UserId::new());
        let as_owner = pending(UserId::new(), user);
        let unrelated = pending(UserId::new(), UserId::new());
        for a in [&as_client, &as_owner, &unrelated] {
            let _ = AppointmentStore::insert(&store, a).await;
        }

        let all = store
            .list_for_user(user, AppointmentFilter::default())
            .await
            .unwrap_or_default();
        assert_eq!(all.len(), 2);

        let owned = store
            .list_for_user(
                user,
                AppointmentFilter {
                    role: Some(Party::Owner),
                    status: None,
                },
            )
            .await
            .unwrap_or_default();
        assert_eq!(owned.len(), 1);
        assert!(owned.iter().all(|a| a.id == as_owner.id));

        let confirmed = store
            .list_for_user(
                user,
                AppointmentFilter {
                    role: None,
                    status: Some(AppointmentStatus::Confirmed),
                },
            )
            .await
            .unwrap_or_default();
        assert!(confirmed.is_empty());
    }

    #[tokio::test]
    async fn mark_read_keeps_first_read_at_and_is_scoped() {
        let store = InMemoryPersistence::new();
        let recipient = UserId::new();
        let notification = notification_for(recipient);
        let _ = NotificationStore::insert(&store, &notification).await;

        let first_read = Utc::now();
        let Ok(Some(read)) = store.mark_read(recipient, notification.id, first_read).await else {
            panic!("recipient should be able to read");
        };
        assert_eq!(read.read_at, Some(first_read));

        let later = first_read + Duration::minutes(5);
        let Ok(Some(again)) = store.mark_read(recipient, notification.id, later).await else {
            panic!("second read should succeed");
        };
        assert_eq!(again.read_at, Some(first_read));

        let stranger = store
            .mark_read(UserId::new(), notification.id, later)
            .await;
        assert!(matches!(stranger, Ok(None)));
    }

    #[tokio::test]
    async fn mark_all_read_is_idempotent() {
        let store = InMemoryPersistence::new();
        let recipient = UserId::new();
        for _ in 0..3 {
            let _ = NotificationStore::insert(&store, &notification_for(recipient)).await;
        }
        let _ = NotificationStore::insert(&store, &notification_for(UserId::new())).await;

        assert!(matches!(store.mark_all_read(recipient, Utc::now()).await, Ok(3)));
        assert!(matches!(store.mark_all_read(recipient, Utc::now()).await, Ok(0)));
        assert!(matches!(store.unread_count(recipient).await, Ok(0)));
    }

    #[tokio::test]
    async fn credential_put_replaces_whole_value() {
        let store = InMemoryPersistence::new();
        let user = UserId::new();
        let first = CalendarCredential {
            access_token: "a1".to_string(),
            refresh_token: "r1".to_string(),
            expires_at: Utc::now(),
        };
        let second = CalendarCredential {
            access_token: "a2".to_string(),
            refresh_token: "r2".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let _ = store.put(user, &first).await;
        let _ = store.put(user, &second).await;
        let Ok(Some(stored)) = CredentialStore::get(&store, user).await else {
            panic!("credential should exist");
        };
        assert_eq!(stored, second);
        assert!(matches!(store.remove(user).await, Ok(true)));
        assert!(matches!(store.remove(user).await, Ok(false)));
    }
}
