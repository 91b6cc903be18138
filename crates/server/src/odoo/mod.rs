//! Odoo JSON-RPC client.
//!
//! Talks to Odoo's web controllers the same way the Odoo web client does:
//! a `session_id` obtained from `/web/session/authenticate` is attached to
//! every `/web/dataset/call_kw` request.
//!
//! # Architecture
//!
//! - [`session`] - authentication and the shared session cache
//! - [`client`] - `search_read` calls with one re-authentication retry and
//!   complete pagination
//! - [`records`] - typed records and decoders for Odoo's JSON shapes
//!
//! # Security
//!
//! The service password and session tokens are held in `SecretString` and
//! never logged. Remote error bodies are logged server-side only.

pub mod client;
pub mod records;
pub mod session;

pub use client::{OdooClient, SearchRead};
pub use records::{LedgerLine, Many2one, UserRecord};
pub use session::{SessionCache, SessionHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON-RPC error code Odoo uses for an expired or unknown session.
pub const SESSION_EXPIRED_CODE: i64 = 100;

/// Errors that can occur when interacting with Odoo.
#[derive(Debug, Error)]
pub enum OdooError {
    /// The request did not complete within the configured timeout.
    #[error("Odoo request timed out")]
    Timeout,

    /// Network or protocol failure.
    #[error("HTTP error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Odoo rejected the service credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The session handle was rejected.
    #[error("Odoo session expired")]
    SessionExpired,

    /// Odoo answered with a JSON-RPC error payload.
    #[error("Odoo error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Error message, including the server-side exception message when present.
        message: String,
    },

    /// Odoo answered with a non-success HTTP status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// The response body had an unexpected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(String),

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for OdooError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

/// Outgoing JSON-RPC 2.0 `call` envelope.
#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<P> {
    jsonrpc: &'static str,
    method: &'static str,
    params: P,
}

impl<P> RpcRequest<P> {
    pub(crate) const fn call(params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "call",
            params,
        }
    }
}

/// Incoming JSON-RPC 2.0 envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Error object inside a JSON-RPC response.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<RpcErrorData>,
}

/// Server-side exception details Odoo attaches to errors.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RpcError {
    /// Whether the error means the session handle is no longer valid.
    pub(crate) fn is_session_error(&self) -> bool {
        self.code == SESSION_EXPIRED_CODE
            || self
                .data
                .as_ref()
                .and_then(|data| data.name.as_deref())
                .is_some_and(|name| name.ends_with("SessionExpiredException"))
    }

    /// The most specific message available.
    pub(crate) fn detail(&self) -> String {
        match self.data.as_ref().and_then(|data| data.message.as_deref()) {
            Some(detail) if !detail.is_empty() => format!("{}: {detail}", self.message),
            _ => self.message.clone(),
        }
    }
}

impl RpcResponse {
    /// Split the envelope into its result or its error.
    pub(crate) fn into_result(self) -> Result<serde_json::Value, RpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}
