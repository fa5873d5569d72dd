//! Google Calendar v3 implementation of [`CalendarClient`].

use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::client::{CalendarClient, CalendarError, EventDraft};
use crate::config::GatewayConfig;
use crate::domain::TokenGrant;
use crate::error::GatewayError;

/// Default Google Calendar REST base URL.
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Default Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google Calendar provider writing to each owner's primary calendar.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    api_base: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    time_zone: Tz,
}

impl GoogleCalendarClient {
    /// Creates a client against explicit endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        token_url: impl Into<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        time_zone: Tz,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            client_id,
            client_secret,
            time_zone,
        })
    }

    /// Creates a client from the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.calendar_api_base.clone(),
            config.calendar_token_url.clone(),
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.operating_timezone,
            config.calendar_timeout,
        )
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.api_base)
    }

    fn event_time(&self, at: chrono::DateTime<chrono::Utc>) -> GoogleEventTime {
        GoogleEventTime {
            date_time: at.with_timezone(&self.time_zone).to_rfc3339(),
            time_zone: self.time_zone.name(),
        }
    }
}

async fn api_error(response: reqwest::Response) -> CalendarError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return CalendarError::Unauthorized;
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    CalendarError::Api {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn create_event(
        &self,
        access_token: &str,
        event: &EventDraft,
    ) -> Result<String, CalendarError> {
        let body = GoogleEventBody {
            summary: &event.summary,
            description: &event.description,
            start: self.event_time(event.start),
            end: self.event_time(event.end),
            attendees: event
                .attendee_email
                .as_deref()
                .map(|email| vec![GoogleAttendee { email }])
                .unwrap_or_default(),
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let created: GoogleCreatedEvent = response.json().await?;
        Ok(created.id)
    }

    async fn delete_event(
        &self,
        access_token: &str,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(format!("{}/{event_id}", self.events_url()))
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                tracing::debug!(event_id, "calendar event already gone");
                Ok(())
            }
            _ => Err(api_error(response).await),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CalendarError> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(CalendarError::NotConfigured);
        };

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| CalendarError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::RefreshFailed(format!("{status}: {body}")));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| CalendarError::RefreshFailed(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct GoogleEventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: GoogleEventTime,
    end: GoogleEventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<GoogleAttendee<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: String,
    time_zone: &'static str,
}

#[derive(Debug, Serialize)]
struct GoogleAttendee<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleCreatedEvent {
    id: String,
}
