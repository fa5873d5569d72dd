//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a stable `kind` string, a numeric code and an HTTP status code.
//! Only state-machine errors ever reach a client through a primary action;
//! [`GatewayError::ExternalServiceDegraded`] is produced at the calendar and
//! broadcast boundaries, where it is logged and dropped.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::AppointmentStatus;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "kind": "invalid_state_error",
///   "code": 2003,
///   "message": "cannot confirm an appointment that is cancelled"
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Stable error kind (see the taxonomy on [`GatewayError`]).
    pub kind: &'static str,
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status            |
/// |-----------|-----------------------|------------------------|
/// | 1000–1999 | Request / identity    | 400 / 401 / 403        |
/// | 2000–2999 | State / Not Found     | 404 / 409              |
/// | 3000–3999 | Server                | 500                    |
/// | 4000–4999 | External services     | 503                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed input, rejected synchronously.
    #[error("{0}")]
    Validation(String),

    /// No authenticated user could be resolved for the request.
    #[error("authentication required")]
    Unauthenticated,

    /// The caller is not the party required for the action.
    #[error("{0}")]
    Authorization(String),

    /// The requested resource does not exist (or is soft-deleted).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requested transition is not legal from the current status.
    #[error("cannot {action} an appointment that is {from}")]
    InvalidState {
        /// Action that was attempted (e.g. `"confirm"`).
        action: &'static str,
        /// Status observed when the action was rejected.
        from: AppointmentStatus,
    },

    /// The optimistic-concurrency guard lost a race; refetch and retry.
    #[error("appointment was modified concurrently; expected it to be {expected}")]
    Conflict {
        /// Status the caller expected to transition from.
        expected: AppointmentStatus,
    },

    /// Calendar sync or realtime broadcast failed.
    #[error("external service degraded: {0}")]
    ExternalServiceDegraded(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the stable `kind` string for this variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthenticated => "unauthenticated",
            Self::Authorization(_) => "authorization_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidState { .. } => "invalid_state_error",
            Self::Conflict { .. } => "conflict_error",
            Self::ExternalServiceDegraded(_) => "external_service_degraded",
            Self::Persistence(_) => "persistence_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Unauthenticated => 1002,
            Self::Authorization(_) => 1003,
            Self::NotFound(_) => 2001,
            Self::Conflict { .. } => 2002,
            Self::InvalidState { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::ExternalServiceDegraded(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState { .. } | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ExternalServiceDegraded(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }
        let body = ErrorResponse {
            kind: self.kind(),
            code: self.error_code(),
            message: self.to_string(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
