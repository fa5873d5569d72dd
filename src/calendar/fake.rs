//! Scriptable in-process [`CalendarClient`] for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::client::{CalendarClient, CalendarError, EventDraft};
use crate::domain::TokenGrant;

/// How the fake answers event calls.
#[derive(Debug, Clone, Copy, Default)]
pub enum FakeMode {
    /// Every call succeeds.
    #[default]
    Ok,
    /// Every call fails with a provider error.
    FailAll,
    /// The first event call is rejected with `401`, later ones succeed.
    UnauthorizedOnce,
    /// Every event call is rejected with `401`.
    AlwaysUnauthorized,
    /// Every event call sleeps this long before succeeding.
    Slow(Duration),
}

/// Counting fake calendar provider.
#[derive(Debug, Default)]
pub struct FakeCalendarClient {
    /// Behavior of event calls.
    pub mode: FakeMode,
    /// Make every refresh fail.
    pub refresh_fails: bool,
    /// `expires_in` of granted tokens; one hour when unset.
    pub grant_lifetime: Option<i64>,
    /// Number of `create_event` calls.
    pub creates: AtomicUsize,
    /// Number of `delete_event` calls.
    pub deletes: AtomicUsize,
    /// Number of `refresh` calls.
    pub refreshes: AtomicUsize,
    rejected_once: AtomicBool,
}

impl FakeCalendarClient {
    /// Creates a fake answering in `mode`.
    pub fn with_mode(mode: FakeMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    async fn outcome(&self) -> Result<(), CalendarError> {
        match self.mode {
            FakeMode::Ok => Ok(()),
            FakeMode::FailAll => Err(CalendarError::Api {
                status: 500,
                body: "backend error".to_string(),
            }),
            FakeMode::UnauthorizedOnce => {
                if self.rejected_once.swap(true, Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(CalendarError::Unauthorized)
                }
            }
            FakeMode::AlwaysUnauthorized => Err(CalendarError::Unauthorized),
            FakeMode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CalendarClient for FakeCalendarClient {
    async fn create_event(
        &self,
        _access_token: &str,
        _event: &EventDraft,
    ) -> Result<String, CalendarError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.outcome().await?;
        let created = self.creates.load(Ordering::SeqCst);
        Ok(format!("evt-{created}"))
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        _event_id: &str,
    ) -> Result<(), CalendarError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.outcome().await
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, CalendarError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.refresh_fails {
            return Err(CalendarError::RefreshFailed("invalid_grant".to_string()));
        }
        Ok(TokenGrant {
            access_token: format!("refreshed-{n}"),
            expires_in: self.grant_lifetime.unwrap_or(3600),
            refresh_token: None,
        })
    }
}
