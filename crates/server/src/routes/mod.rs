//! HTTP route handlers for the bridge.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (Odoo session)
//!
//! # Credit (rate limited)
//! GET  /check-credit             - Credit check
//! GET  /api/odoo/check-credit    - Same handler, Odoo connector path
//! GET  /api/shopify/check-credit - Same handler, storefront proxy path
//! ```

pub mod credit;
pub mod health;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request},
    middleware::from_fn,
    routing::get,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::middleware::{credit_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Paths served by the credit check handler.
pub const CREDIT_PATHS: [&str; 3] = [
    "/check-credit",
    "/api/odoo/check-credit",
    "/api/shopify/check-credit",
];

/// Create the credit routes router.
pub fn credit_routes(http: &HttpConfig) -> Router<AppState> {
    CREDIT_PATHS
        .into_iter()
        .fold(Router::new(), |router, path| {
            router.route(path, get(credit::check_credit))
        })
        .layer(credit_rate_limiter(http))
}

/// Create the health routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Build the full application router.
///
/// Sentry layers are left to the binary so tests run without a hub. Serve
/// with `into_make_service_with_connect_info::<SocketAddr>()` so the rate
/// limiter can fall back to the peer address.
pub fn app(state: AppState) -> Router {
    let http = state.config().http.clone();

    Router::new()
        .merge(health_routes())
        .merge(credit_routes(&http))
        .layer(cors_layer(&http))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Build the CORS layer from the configured origins.
///
/// With no origins configured any origin is allowed. Origins that are not
/// valid header values are skipped with a warning.
fn cors_layer(http: &HttpConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);

    if http.cors_allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = http
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
