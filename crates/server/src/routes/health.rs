//! Health check handlers.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies an Odoo session can be acquired (cached or fresh).
/// Returns 503 Service Unavailable if Odoo rejects the service account or is
/// not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.odoo().session().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
