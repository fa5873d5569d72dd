//! Calendar integration boundary.
//!
//! [`CalendarClient`] is the raw provider API, [`GoogleCalendarClient`] its
//! production implementation, and [`CalendarSync`] the adapter services call:
//! it owns credential refresh and turns every failure into "sync skipped".

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod google;
pub mod sync;

pub use client::{CalendarClient, CalendarError, EventDraft};
pub use google::GoogleCalendarClient;
pub use sync::{CalendarConnection, CalendarSync};
