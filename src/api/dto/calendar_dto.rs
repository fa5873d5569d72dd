//! DTOs for calendar credential and channel authorization endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CalendarCredential, expiry_after};
use crate::error::GatewayError;

/// `PUT /calendar/credentials` request body, as returned by the OAuth code
/// exchange.
#[derive(Clone, Deserialize, ToSchema)]
pub struct ConnectCalendarRequest {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token lifetime, in seconds.
    pub expires_in: i64,
}

impl std::fmt::Debug for ConnectCalendarRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectCalendarRequest")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

impl ConnectCalendarRequest {
    /// Converts the grant into a stored credential.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if `expires_in` is not positive or
    /// too large to express as a timestamp.
    pub fn into_credential(self, now: DateTime<Utc>) -> Result<CalendarCredential, GatewayError> {
        if self.expires_in <= 0 {
            return Err(GatewayError::Validation(
                "expires_in must be positive".to_string(),
            ));
        }
        let expires_at = expiry_after(now, self.expires_in).ok_or_else(|| {
            GatewayError::Validation("expires_in is out of range".to_string())
        })?;
        Ok(CalendarCredential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

/// `POST /broadcasting/auth` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChannelAuthRequest {
    /// Channel to authorize, `notifications.{user_id}`.
    pub channel_name: String,
}

/// `POST /broadcasting/auth` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelAuthResponse {
    /// The authorized channel.
    pub channel: String,
    /// Always `true`; refusals are `403` errors.
    pub authorized: bool,
}
