//! Calendar API seam: the [`CalendarClient`] trait and its data types.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{Appointment, TokenGrant};

/// Failure talking to the external calendar.
///
/// None of these ever reach an API caller; [`super::CalendarSync`] logs them
/// and degrades to "sync skipped".
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// The user has no stored credential.
    #[error("calendar not connected")]
    NotConnected,

    /// The provider rejected the access token.
    #[error("access token rejected")]
    Unauthorized,

    /// The token refresh call failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The provider answered with a non-success status.
    #[error("calendar api error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Network or TLS failure.
    #[error("calendar request failed: {0}")]
    Transport(String),

    /// The provider answered with an unexpected body.
    #[error("unexpected calendar response: {0}")]
    Decode(String),

    /// OAuth client credentials are not configured.
    #[error("calendar oauth client is not configured")]
    NotConfigured,

    /// Loading or storing the credential failed.
    #[error("credential storage failed: {0}")]
    Storage(String),

    /// The whole call, refresh and retry included, exceeded its budget.
    #[error("calendar call timed out")]
    Timeout,
}

impl From<reqwest::Error> for CalendarError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// An event to create in the owner's calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    /// Event title.
    pub summary: String,
    /// Event body.
    pub description: String,
    /// Start instant.
    pub start: DateTime<Utc>,
    /// End instant.
    pub end: DateTime<Utc>,
    /// Invitee, usually the client.
    pub attendee_email: Option<String>,
}

impl EventDraft {
    /// Describes a confirmed appointment lasting `duration`, or `None` if
    /// the end of the event is past the last representable instant.
    #[must_use]
    pub fn for_appointment(
        appointment: &Appointment,
        attendee_email: Option<String>,
        duration: Duration,
    ) -> Option<Self> {
        let end = appointment.scheduled_at.checked_add_signed(duration)?;
        let mut description = format!("Motif : {}", appointment.reason);
        if let Some(location) = &appointment.location {
            description.push_str(&format!("\nLieu : {location}"));
        }
        if let Some(notes) = &appointment.notes {
            description.push_str(&format!("\nNotes : {notes}"));
        }
        description.push_str(&format!("\nRéférence : {}", appointment.id));

        Some(Self {
            summary: format!("Rendez-vous : {}", appointment.kind.label()),
            description,
            start: appointment.scheduled_at,
            end,
            attendee_email,
        })
    }
}

/// Low-level operations of an external calendar provider.
#[async_trait]
pub trait CalendarClient: Send + Sync + std::fmt::Debug {
    /// Creates an event and returns the provider's event id.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::Unauthorized`] when the token is rejected,
    /// or another [`CalendarError`] on any other failure.
    async fn create_event(
        &self,
        access_token: &str,
        event: &EventDraft,
    ) -> Result<String, CalendarError>;

    /// Deletes an event. An event that is already gone counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::Unauthorized`] when the token is rejected,
    /// or another [`CalendarError`] on any other failure.
    async fn delete_event(&self, access_token: &str, event_id: &str)
    -> Result<(), CalendarError>;

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns a [`CalendarError`] if the provider refuses the refresh.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CalendarError>;
}
