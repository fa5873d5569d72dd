//! Best-effort calendar synchronization on behalf of vehicle owners.
//!
//! [`CalendarSync`] never fails the caller: every problem (no credential,
//! refresh rejected, provider error, timeout) is logged and reported as
//! "sync skipped". The token dance is:
//!
//! 1. load the owner's credential, none means not connected;
//! 2. refresh it first if it is expired, persisting the new value;
//! 3. call the provider; on `401` refresh once and retry once.
//!
//! A failed refresh makes the calendar count as not connected for this
//! invocation only. The stored credential is left untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::client::{CalendarClient, CalendarError, EventDraft};
use crate::domain::{Appointment, CalendarCredential, UserId};
use crate::error::GatewayError;
use crate::persistence::CredentialStore;

/// Whether an owner's calendar is connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CalendarConnection {
    /// `true` if a credential is stored.
    pub connected: bool,
    /// Expiry of the stored access token.
    pub expires_at: Option<DateTime<Utc>>,
}

enum Call<'a> {
    Create(&'a EventDraft),
    Delete(&'a str),
}

impl Call<'_> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create_event",
            Self::Delete(_) => "delete_event",
        }
    }
}

/// Calendar side effects with credential refresh and bounded latency.
#[derive(Debug, Clone)]
pub struct CalendarSync {
    client: Arc<dyn CalendarClient>,
    credentials: Arc<dyn CredentialStore>,
    timeout: Duration,
    event_duration: chrono::Duration,
}

impl CalendarSync {
    /// Creates the adapter. `timeout` bounds a whole call, refresh and retry
    /// included. `event_duration` is the length of created events.
    #[must_use]
    pub fn new(
        client: Arc<dyn CalendarClient>,
        credentials: Arc<dyn CredentialStore>,
        timeout: Duration,
        event_duration: chrono::Duration,
    ) -> Self {
        Self {
            client,
            credentials,
            timeout,
            event_duration,
        }
    }

    /// Builds the event describing a confirmed `appointment`, or `None` if
    /// its end cannot be represented.
    #[must_use]
    pub fn draft(
        &self,
        appointment: &Appointment,
        attendee_email: Option<String>,
    ) -> Option<EventDraft> {
        EventDraft::for_appointment(appointment, attendee_email, self.event_duration)
    }

    /// Creates `event` in the owner's calendar and returns its id, or `None`
    /// if the sync was skipped.
    pub async fn create_event(&self, owner: UserId, event: &EventDraft) -> Option<String> {
        match self.run(owner, Call::Create(event)).await {
            Ok(event_id) => {
                tracing::info!(%owner, event_id = ?event_id, "calendar event created");
                event_id
            }
            Err(e) => {
                log_skipped("create_event", owner, &e);
                None
            }
        }
    }

    /// Deletes an event from the owner's calendar. Returns `false` if the
    /// sync was skipped.
    pub async fn delete_event(&self, owner: UserId, event_id: &str) -> bool {
        match self.run(owner, Call::Delete(event_id)).await {
            Ok(_) => {
                tracing::info!(%owner, event_id, "calendar event deleted");
                true
            }
            Err(e) => {
                log_skipped("delete_event", owner, &e);
                false
            }
        }
    }

    /// Stores a freshly obtained credential for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if a token is blank, or
    /// [`GatewayError::Persistence`] on storage failure.
    pub async fn connect(
        &self,
        owner: UserId,
        credential: CalendarCredential,
    ) -> Result<CalendarConnection, GatewayError> {
        if credential.access_token.trim().is_empty() || credential.refresh_token.trim().is_empty()
        {
            return Err(GatewayError::Validation(
                "access_token and refresh_token must not be empty".to_string(),
            ));
        }
        self.credentials.put(owner, &credential).await?;
        tracing::info!(%owner, "calendar connected");
        Ok(CalendarConnection {
            connected: true,
            expires_at: Some(credential.expires_at),
        })
    }

    /// Forgets the owner's credential. Returns `false` if none was stored.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    pub async fn disconnect(&self, owner: UserId) -> Result<bool, GatewayError> {
        let removed = self.credentials.remove(owner).await?;
        tracing::info!(%owner, removed, "calendar disconnected");
        Ok(removed)
    }

    /// Reports whether the owner's calendar is connected.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    pub async fn status(&self, owner: UserId) -> Result<CalendarConnection, GatewayError> {
        let credential = self.credentials.get(owner).await?;
        Ok(CalendarConnection {
            connected: credential.is_some(),
            expires_at: credential.map(|c| c.expires_at),
        })
    }

    async fn run(&self, owner: UserId, call: Call<'_>) -> Result<Option<String>, CalendarError> {
        tokio::time::timeout(self.timeout, self.authorized(owner, call))
            .await
            .unwrap_or(Err(CalendarError::Timeout))
    }

    async fn authorized(
        &self,
        owner: UserId,
        call: Call<'_>,
    ) -> Result<Option<String>, CalendarError> {
        let mut credential = self
            .credentials
            .get(owner)
            .await
            .map_err(|e| CalendarError::Storage(e.to_string()))?
            .ok_or(CalendarError::NotConnected)?;

        let mut refreshed = false;
        if credential.is_expired(Utc::now()) {
            tracing::debug!(%owner, "calendar token expired, refreshing");
            credential = self.refresh(owner, &credential).await?;
            refreshed = true;
        }

        match self.invoke(&credential.access_token, &call).await {
            Err(CalendarError::Unauthorized) if !refreshed => {
                tracing::debug!(%owner, call = call.name(), "calendar token rejected, refreshing");
                credential = self.refresh(owner, &credential).await?;
                self.invoke(&credential.access_token, &call).await
            }
            other => other,
        }
    }

    async fn invoke(&self, access_token: &str, call: &Call<'_>) -> Result<Option<String>, CalendarError> {
        match call {
            Call::Create(event) => self.client.create_event(access_token, event).await.map(Some),
            Call::Delete(event_id) => self
                .client
                .delete_event(access_token, event_id)
                .await
                .map(|()| None),
        }
    }

    async fn refresh(
        &self,
        owner: UserId,
        current: &CalendarCredential,
    ) -> Result<CalendarCredential, CalendarError> {
        let grant = self
            .client
            .refresh(&current.refresh_token)
            .await
            .map_err(|e| match e {
                CalendarError::RefreshFailed(_) | CalendarError::NotConfigured => e,
                other => CalendarError::RefreshFailed(other.to_string()),
            })?;

        let next = current.refreshed(grant, Utc::now()).ok_or_else(|| {
            CalendarError::RefreshFailed("token lifetime out of range".to_string())
        })?;
        // A lost write only costs another refresh next time.
        if let Err(e) = self.credentials.put(owner, &next).await {
            tracing::warn!(%owner, error = %e, "failed to persist refreshed calendar credential");
        }
        Ok(next)
    }
}

fn log_skipped(operation: &'static str, owner: UserId, error: &CalendarError) {
    match error {
        CalendarError::NotConnected => {
            tracing::debug!(%owner, operation, "calendar not connected, sync skipped");
        }
        CalendarError::RefreshFailed(_) | CalendarError::NotConfigured => {
            tracing::warn!(
                %owner,
                operation,
                error = %error,
                "calendar token refresh failed, treating calendar as not connected"
            );
        }
        _ => {
            tracing::warn!(%owner, operation, error = %error, "calendar sync skipped");
        }
    }
}
