//! OAuth credential for a user's external calendar.
//!
//! [`CalendarCredential`] is an immutable value: a refresh produces a new
//! credential through [`CalendarCredential::refreshed`] and the store replaces
//! the old one wholesale. Two concurrent refreshes therefore race benignly;
//! the last write wins and both values are valid.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Seconds before `expires_at` at which a token is already treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Access/refresh token pair for one user's calendar account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CalendarCredential {
    /// Bearer token sent to the calendar API.
    pub access_token: String,
    /// Long-lived token used to mint new access tokens.
    pub refresh_token: String,
    /// When `access_token` stops being accepted.
    pub expires_at: DateTime<Utc>,
}

// Tokens must never end up in logs.
impl std::fmt::Debug for CalendarCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarCredential")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CalendarCredential {
    /// Returns `true` if the access token is expired at `now`, or will be
    /// within [`EXPIRY_SKEW_SECS`].
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        expiry_after(now, EXPIRY_SKEW_SECS).is_none_or(|deadline| deadline >= self.expires_at)
    }

    /// Builds the credential that replaces `self` after a successful token
    /// refresh. Providers may omit the refresh token, in which case the
    /// current one is kept.
    ///
    /// Returns `None` if the granted lifetime does not fit in a timestamp.
    #[must_use]
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            expires_at: expiry_after(now, grant.expires_in)?,
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
        })
    }
}

/// The instant `lifetime_secs` after `now`, or `None` when it falls outside
/// the range of [`DateTime`].
#[must_use]
pub fn expiry_after(now: DateTime<Utc>, lifetime_secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(lifetime_secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// Result of a token-endpoint call.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    /// New access token.
    pub access_token: String,
    /// Lifetime of the access token, in seconds.
    pub expires_in: i64,
    /// Rotated refresh token, when the provider issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}
