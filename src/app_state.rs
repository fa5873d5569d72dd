//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::calendar::{CalendarClient, CalendarSync};
use crate::config::GatewayConfig;
use crate::persistence::{AppointmentStore, CredentialStore, NotificationStore, UserDirectory};
use crate::service::{AppointmentService, NotificationDispatcher};
use crate::ws::{Broadcaster, ChannelBroadcaster};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Appointment state machine.
    pub appointments: Arc<AppointmentService>,
    /// Notification inbox and realtime push.
    pub notifications: Arc<NotificationDispatcher>,
    /// Calendar connection management.
    pub calendar: Arc<CalendarSync>,
    /// Per-user realtime channels behind `/ws`.
    pub broadcaster: Arc<ChannelBroadcaster>,
}

impl AppState {
    /// Wires every service over a single persistence backend.
    pub fn new<P>(
        persistence: Arc<P>,
        calendar_client: Arc<dyn CalendarClient>,
        config: &GatewayConfig,
    ) -> Self
    where
        P: AppointmentStore + NotificationStore + CredentialStore + UserDirectory + 'static,
    {
        let broadcaster = Arc::new(ChannelBroadcaster::new(config.channel_capacity));

        let calendar = CalendarSync::new(
            calendar_client,
            Arc::clone(&persistence) as Arc<dyn CredentialStore>,
            config.calendar_timeout,
            config.calendar_event_duration,
        );
        let notifications = NotificationDispatcher::new(
            Arc::clone(&persistence) as Arc<dyn NotificationStore>,
            Arc::clone(&broadcaster) as Arc<dyn Broadcaster>,
        );
        let appointments = AppointmentService::new(
            Arc::clone(&persistence) as Arc<dyn AppointmentStore>,
            persistence as Arc<dyn UserDirectory>,
            calendar.clone(),
            notifications.clone(),
            config.operating_timezone,
        );

        Self {
            appointments: Arc::new(appointments),
            notifications: Arc::new(notifications),
            calendar: Arc::new(calendar),
            broadcaster,
        }
    }
}
