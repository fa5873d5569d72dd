//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{AppointmentRow, CredentialRow, NotificationRow};
use super::{
    AppointmentFilter, AppointmentStore, CredentialStore, NotificationPage, NotificationStore,
    StatusChange, UserDirectory,
};
use crate::config::GatewayConfig;
use crate::domain::{
    Appointment, AppointmentId, AppointmentStatus, CalendarCredential, Notification,
    NotificationId, Party, UserId,
};
use crate::error::GatewayError;

macro_rules! appointment_columns {
    () => {
        "id, client_id, owner_id, vehicle_id, scheduled_at, kind, status, reason, location, \
         notes, external_calendar_event_id, created_at, updated_at, deleted_at"
    };
}

macro_rules! notification_columns {
    () => {
        "id, recipient_id, type, title, message, payload, is_read, read_at, created_at"
    };
}

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool from `config` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Persistence`] if the database is unreachable
    /// or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::Persistence(format!("migration failed: {e}")))?;

        tracing::info!("database migrations applied");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl AppointmentStore for PostgresPersistence {
    async fn insert(&self, appointment: &Appointment) -> Result<(), GatewayError> {
        sqlx::query(concat!(
            "INSERT INTO appointments (",
            appointment_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(appointment.id.as_uuid())
        .bind(appointment.client_id.as_uuid())
        .bind(appointment.owner_id.as_uuid())
        .bind(appointment.vehicle_id.map(uuid::Uuid::from))
        .bind(appointment.scheduled_at)
        .bind(appointment.kind.as_str())
        .bind(appointment.status.as_str())
        .bind(&appointment.reason)
        .bind(&appointment.location)
        .bind(&appointment.notes)
        .bind(&appointment.external_calendar_event_id)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .bind(appointment.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, GatewayError> {
        let row = sqlx::query_as::<_, AppointmentRow>(concat!(
            "SELECT ",
            appointment_columns!(),
            " FROM appointments WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Appointment::try_from).transpose()
    }

    async fn list_for_user(
        &self,
        user: UserId,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, GatewayError> {
        let role = filter.role.map(|r| match r {
            Party::Client => "client",
            Party::Owner => "owner",
        });
        let rows = sqlx::query_as::<_, AppointmentRow>(concat!(
            "SELECT ",
            appointment_columns!(),
            " FROM appointments \
             WHERE deleted_at IS NULL \
               AND ($2::text IS NULL OR status = $2) \
               AND CASE $3::text \
                     WHEN 'client' THEN client_id = $1 \
                     WHEN 'owner' THEN owner_id = $1 \
                     ELSE (client_id = $1 OR owner_id = $1) \
                   END \
             ORDER BY scheduled_at DESC"
        ))
        .bind(user.as_uuid())
        .bind(filter.status.map(AppointmentStatus::as_str))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn compare_and_set_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, GatewayError> {
        let mut tx = self.pool.begin().await?;

        // The row lock makes the event id read and the status write one step
        // with respect to `set_calendar_event_id`.
        let locked: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT external_calendar_event_id FROM appointments \
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL \
             FOR UPDATE",
        )
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let Some((previous_event_id,)) = locked else {
            tx.rollback().await?;
            return Ok(None);
        };

        let row = sqlx::query_as::<_, AppointmentRow>(concat!(
            "UPDATE appointments \
             SET status = $3, \
                 updated_at = $4, \
                 external_calendar_event_id = CASE WHEN $3 = 'confirmed' \
                     THEN external_calendar_event_id ELSE NULL END \
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL \
             RETURNING ",
            appointment_columns!()
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let cleared_event_id = if next == AppointmentStatus::Confirmed {
            None
        } else {
            previous_event_id
        };
        Ok(Some(StatusChange {
            appointment: Appointment::try_from(row)?,
            cleared_event_id,
        }))
    }

    async fn set_calendar_event_id(
        &self,
        id: AppointmentId,
        event_id: &str,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE appointments SET external_calendar_event_id = $2 \
             WHERE id = $1 AND status = 'confirmed' AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn soft_delete(
        &self,
        id: AppointmentId,
        now: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE appointments SET deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL \
               AND status IN ('refused', 'cancelled', 'completed')",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl NotificationStore for PostgresPersistence {
    async fn insert(&self, notification: &Notification) -> Result<(), GatewayError> {
        sqlx::query(concat!(
            "INSERT INTO notifications (",
            notification_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(notification.id.as_uuid())
        .bind(notification.recipient_id.as_uuid())
        .bind(notification.notification_type.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.payload)
        .bind(notification.is_read)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<NotificationPage, GatewayError> {
        let rows = sqlx::query_as::<_, NotificationRow>(concat!(
            "SELECT ",
            notification_columns!(),
            " FROM notifications \
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(recipient.as_uuid())
        .bind(unread_only)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications \
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE)",
        )
        .bind(recipient.as_uuid())
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NotificationPage {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn unread_count(&self, recipient: UserId) -> Result<u64, GatewayError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, GatewayError> {
        let row = sqlx::query_as::<_, NotificationRow>(concat!(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, $3) \
             WHERE id = $1 AND recipient_id = $2 RETURNING ",
            notification_columns!()
        ))
        .bind(id.as_uuid())
        .bind(recipient.as_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn mark_all_read(
        &self,
        recipient: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, GatewayError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CredentialStore for PostgresPersistence {
    async fn get(&self, user: UserId) -> Result<Option<CalendarCredential>, GatewayError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT access_token, refresh_token, expires_at \
             FROM calendar_credentials WHERE user_id = $1",
        )
        .bind(user.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CalendarCredential::from))
    }

    async fn put(
        &self,
        user: UserId,
        credential: &CalendarCredential,
    ) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO calendar_credentials (user_id, access_token, refresh_token, expires_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 access_token = EXCLUDED.access_token, \
                 refresh_token = EXCLUDED.refresh_token, \
                 expires_at = EXCLUDED.expires_at, \
                 updated_at = now()",
        )
        .bind(user.as_uuid())
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, user: UserId) -> Result<bool, GatewayError> {
        let result = sqlx::query("DELETE FROM calendar_credentials WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl UserDirectory for PostgresPersistence {
    async fn email(&self, user: UserId) -> Result<Option<String>, GatewayError> {
        let email = sqlx::query_scalar::<_, Option<String>>("SELECT email FROM users WHERE id = $1")
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(email.flatten())
    }
}

/// These run against a real database: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::domain::{AppointmentKind, NewAppointment};

    async fn database() -> PostgresPersistence {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            panic!("DATABASE_URL must point at a disposable database");
        };
        let config = GatewayConfig {
            database_url,
            ..GatewayConfig::default()
        };
        match PostgresPersistence::connect(&config).await {
            Ok(store) => store,
            Err(e) => panic!("database unreachable: {e}"),
        }
    }

    async fn insert_pending(store: &PostgresPersistence, client: UserId, owner: UserId) -> AppointmentId {
        let now = Utc::now();
        let appointment = NewAppointment {
            client_id: client,
            owner_id: owner,
            vehicle_id: None,
            scheduled_at: now + ChronoDuration::days(3),
            kind: AppointmentKind::TestDrive,
            reason: "Essai routier".to_string(),
            location: None,
            notes: None,
        }
        .into_pending(now);
        if let Err(e) = AppointmentStore::insert(store, &appointment).await {
            panic!("insert failed: {e}");
        }
        appointment.id
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_cas_has_a_single_winner() {
        let store = database().await;
        let id = insert_pending(&store, UserId::new(), UserId::new()).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
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
            match handle.await {
                Ok(Ok(Some(_))) => winners += 1,
                Ok(Ok(None)) => {}
                other => panic!("unexpected CAS outcome: {other:?}"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn event_id_sticks_only_while_confirmed_and_is_reported_when_cleared() {
        let store = database().await;
        let id = insert_pending(&store, UserId::new(), UserId::new()).await;
        let now = Utc::now();

        assert!(matches!(store.set_calendar_event_id(id, "evt-pg").await, Ok(false)));

        let Ok(Some(confirmed)) = store
            .compare_and_set_status(id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, now)
            .await
        else {
            panic!("confirm CAS should win");
        };
        assert!(confirmed.cleared_event_id.is_none());
        assert!(matches!(store.set_calendar_event_id(id, "evt-pg").await, Ok(true)));

        let Ok(Some(cancelled)) = store
            .compare_and_set_status(id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled, now)
            .await
        else {
            panic!("cancel CAS should win");
        };
        assert_eq!(cancelled.cleared_event_id.as_deref(), Some("evt-pg"));
        assert!(cancelled.appointment.external_calendar_event_id.is_none());
        assert!(matches!(store.set_calendar_event_id(id, "evt-late").await, Ok(false)));

        let stale = store
            .compare_and_set_status(id, AppointmentStatus::Confirmed, AppointmentStatus::Completed, now)
            .await;
        assert!(matches!(stale, Ok(None)));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn list_for_user_filters_by_role_and_status() {
        let store = database().await;
        let user = UserId::new();
        let as_client = insert_pending(&store, user, UserId::new()).await;
        let as_owner = insert_pending(&store, UserId::new(), user).await;
        insert_pending(&store, UserId::new(), UserId::new()).await;

        let Ok(all) = store.list_for_user(user, AppointmentFilter::default()).await else {
            panic!("list failed");
        };
        assert_eq!(all.len(), 2);

        let Ok(owned) = store
            .list_for_user(
                user,
                AppointmentFilter {
                    role: Some(Party::Owner),
                    status: None,
                },
            )
            .await
        else {
            panic!("list failed");
        };
        assert_eq!(owned.iter().map(|a| a.id).collect::<Vec<_>>(), vec![as_owner]);

        let _ = store
            .compare_and_set_status(
                as_client,
                AppointmentStatus::Pending,
                AppointmentStatus::Refused,
                Utc::now(),
            )
            .await;
        let Ok(refused) = store
            .list_for_user(
                user,
                AppointmentFilter {
                    role: None,
                    status: Some(AppointmentStatus::Refused),
                },
            )
            .await
        else {
            panic!("list failed");
        };
        assert_eq!(refused.iter().map(|a| a.id).collect::<Vec<_>>(), vec![as_client]);

        assert!(matches!(store.soft_delete(as_client, Utc::now()).await, Ok(true)));
        let Ok(remaining) = store.list_for_user(user, AppointmentFilter::default()).await else {
            panic!("list failed");
        };
        assert_eq!(remaining.len(), 1);
    }
}
