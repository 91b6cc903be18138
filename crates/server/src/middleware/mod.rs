//! HTTP middleware stack for the bridge.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layer (capture errors, binary only)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded into the request span)
//! 4. CORS
//! 5. Rate limiting (governor, credit routes only)

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{ClientIpKeyExtractor, RateLimiterLayer, credit_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
