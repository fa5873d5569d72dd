//! # rdv-gateway
//!
//! Appointment ("RDV") coordination service for a vehicle marketplace.
//!
//! Clients request in-person appointments with vehicle owners; owners
//! confirm or refuse them; either party may cancel a confirmed appointment.
//! Confirmed appointments are mirrored to the owner's external calendar on a
//! best-effort basis, and every status change is stored as a notification
//! and pushed live to the counter-party.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── AppointmentService (service/)
//!     │     ├── CalendarSync (calendar/) ── Google Calendar API
//!     │     └── NotificationDispatcher (service/)
//!     │           └── ChannelBroadcaster (ws/)
//!     │
//!     └── PostgreSQL or in-memory persistence (persistence/)
//! ```
//!
//! Status changes commit first; calendar sync and notifications run after
//! the commit and can never roll it back.

pub mod api;
pub mod app_state;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod server;
pub mod service;
pub mod ws;
