//! rdv-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rdv_gateway::app_state::AppState;
use rdv_gateway::calendar::{CalendarClient, GoogleCalendarClient};
use rdv_gateway::config::{GatewayConfig, LogFormat};
use rdv_gateway::persistence::memory::InMemoryPersistence;
use rdv_gateway::persistence::postgres::PostgresPersistence;
use rdv_gateway::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        persistence = config.persistence_enabled,
        timezone = %config.operating_timezone,
        "starting rdv-gateway"
    );

    let calendar_client: Arc<dyn CalendarClient> =
        Arc::new(GoogleCalendarClient::from_config(&config)?);
    if config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CALENDAR_CLIENT_ID not set, calendar tokens cannot be refreshed");
    }

    let app_state = if config.persistence_enabled {
        let persistence = PostgresPersistence::connect(&config)
            .await
            .context("failed to connect to PostgreSQL")?;
        AppState::new(Arc::new(persistence), calendar_client, &config)
    } else {
        tracing::warn!("persistence disabled, using in-memory stores");
        AppState::new(Arc::new(InMemoryPersistence::new()), calendar_client, &config)
    };

    let app = server::build_app(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(listener, app).await?;

    Ok(())
}
