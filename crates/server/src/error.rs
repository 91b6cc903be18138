//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::credit::CreditError;

/// Application-level error type for the bridge.
#[derive(Debug, Error)]
pub enum AppError {
    /// Credit check failed.
    #[error(transparent)]
    Credit(#[from] CreditError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Credit(CreditError::Validation(_) | CreditError::Denied(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Credit(CreditError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Credit(CreditError::Upstream(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller.
    ///
    /// Account mismatches never echo either account, and upstream failures
    /// never include Odoo's error text.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Credit(CreditError::Validation(err)) => err.to_string(),
            Self::Credit(CreditError::Denied(_)) => {
                "company does not match the customer's account".to_string()
            }
            Self::Credit(CreditError::NotFound(_)) => "customer not found in Odoo".to_string(),
            Self::Credit(CreditError::Upstream(_)) => "error checking credit in Odoo".to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Credit(CreditError::Upstream(_))) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
