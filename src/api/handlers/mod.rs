//! REST endpoint handlers organized by resource.

pub mod appointment;
pub mod broadcasting;
pub mod calendar;
pub mod notification;
pub mod system;

use std::str::FromStr;

use axum::Router;

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Composes all resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(appointment::routes())
        .merge(notification::routes())
        .merge(calendar::routes())
        .merge(broadcasting::routes())
        .merge(system::routes())
}

/// Parses a path id, reporting failures with the usual error body.
fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::Validation(format!("invalid {what} id: {raw}")))
}
