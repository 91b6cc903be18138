//! Odoo `search_read` client.
//!
//! Every query runs under the shared session. When Odoo reports the session
//! invalid, the client discards it, authenticates once more, and retries the
//! query exactly once.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use super::session::{SessionCache, SessionHandle, authenticate};
use super::{OdooError, RpcRequest, RpcResponse};
use crate::config::OdooConfig;

/// Header the Odoo web client uses to pass the session without cookies.
const SESSION_HEADER: &str = "X-Openerp-Session-Id";

/// A `search_read` query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRead {
    model: String,
    domain: Vec<Value>,
    fields: Vec<String>,
    limit: Option<u32>,
    offset: u32,
    order: Option<String>,
}

impl SearchRead {
    /// Start a query over `model` with an empty domain.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            domain: Vec::new(),
            fields: Vec::new(),
            limit: None,
            offset: 0,
            order: None,
        }
    }

    /// Add a `[field, operator, value]` term (terms are ANDed).
    #[must_use]
    pub fn filter(mut self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.domain
            .push(Value::Array(vec![field.into(), operator.into(), value.into()]));
        self
    }

    /// Restrict the returned fields.
    #[must_use]
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|field| (*field).to_string()).collect();
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` rows.
    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Sort specification, e.g. `"id asc"`.
    #[must_use]
    pub fn order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }

    fn params(&self) -> CallKwParams<'_> {
        CallKwParams {
            model: &self.model,
            method: "search_read",
            args: [&self.domain],
            kwargs: SearchReadKwargs {
                fields: &self.fields,
                limit: self.limit,
                offset: self.offset,
                order: self.order.as_deref(),
            },
        }
    }
}

/// Parameters of `/web/dataset/call_kw`.
#[derive(Serialize)]
struct CallKwParams<'a> {
    model: &'a str,
    method: &'static str,
    args: [&'a Vec<Value>; 1],
    kwargs: SearchReadKwargs<'a>,
}

#[derive(Serialize)]
struct SearchReadKwargs<'a> {
    fields: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a str>,
}

/// Odoo JSON-RPC client.
///
/// Cheaply cloneable. Clones share the HTTP connection pool and the session
/// cache.
#[derive(Clone)]
pub struct OdooClient {
    inner: Arc<OdooClientInner>,
}

struct OdooClientInner {
    http: reqwest::Client,
    config: OdooConfig,
    sessions: Arc<SessionCache>,
}

impl OdooClient {
    /// Create a client with its own empty session cache.
    ///
    /// # Errors
    ///
    /// Returns `OdooError::Transport` if the HTTP client cannot be built.
    pub fn new(config: OdooConfig) -> Result<Self, OdooError> {
        Self::with_sessions(config, Arc::new(SessionCache::new()))
    }

    /// Create a client that uses an existing session cache.
    ///
    /// # Errors
    ///
    /// Returns `OdooError::Transport` if the HTTP client cannot be built.
    pub fn with_sessions(
        config: OdooConfig,
        sessions: Arc<SessionCache>,
    ) -> Result<Self, OdooError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(OdooClientInner {
                http,
                config,
                sessions,
            }),
        })
    }

    /// Get a reference to the Odoo configuration.
    #[must_use]
    pub fn config(&self) -> &OdooConfig {
        &self.inner.config
    }

    /// Get the shared session cache.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.inner.sessions
    }

    /// Return the cached session, authenticating if there is none.
    ///
    /// # Errors
    ///
    /// Returns `OdooError::AuthenticationFailed` if Odoo rejects the service
    /// credentials, or a transport error if Odoo is unreachable.
    pub async fn session(&self) -> Result<SessionHandle, OdooError> {
        self.inner
            .sessions
            .get_or_authenticate(|| authenticate(&self.inner.http, &self.inner.config))
            .await
    }

    /// Run one `search_read` call and decode the rows as `T`.
    ///
    /// # Errors
    ///
    /// Returns `OdooError::SessionExpired` if the session is rejected twice,
    /// `OdooError::Remote` for JSON-RPC errors, `OdooError::Decode` if the rows
    /// do not match `T`, and transport errors otherwise.
    #[instrument(skip(self, query), fields(model = %query.model, offset = query.offset))]
    pub async fn search_read<T: DeserializeOwned>(
        &self,
        query: &SearchRead,
    ) -> Result<Vec<T>, OdooError> {
        let session = self.session().await?;

        match self.call_search_read(&session, query).await {
            Err(OdooError::SessionExpired) => {
                tracing::warn!("Odoo session rejected, re-authenticating");
                self.inner.sessions.invalidate(&session).await;
                let session = self.session().await?;
                self.call_search_read(&session, query).await
            }
            other => other,
        }
    }

    /// Run `search_read` page by page until every matching row is fetched.
    ///
    /// Pages use the configured page size and the query's own offset as the
    /// starting point; any `limit` set on `query` is replaced. A failure on
    /// any page fails the whole call.
    ///
    /// # Errors
    ///
    /// Same as [`OdooClient::search_read`].
    #[instrument(skip(self, query), fields(model = %query.model))]
    pub async fn search_read_all<T: DeserializeOwned>(
        &self,
        query: &SearchRead,
    ) -> Result<Vec<T>, OdooError> {
        let page_size = self.inner.config.page_size;
        let mut rows = Vec::new();
        let mut offset = query.offset;
        let mut pages = 0_u32;

        loop {
            let page_query = query.clone().limit(page_size).offset(offset);
            let page: Vec<T> = self.search_read(&page_query).await?;
            let fetched = page.len();
            if fetched > page_size as usize {
                return Err(OdooError::Decode(format!(
                    "{}: page of {fetched} rows exceeds limit {page_size}",
                    query.model
                )));
            }
            rows.extend(page);
            pages += 1;

            if fetched < page_size as usize {
                break;
            }
            offset = offset.checked_add(page_size).ok_or_else(|| {
                OdooError::Decode(format!("{}: offset overflow while paginating", query.model))
            })?;
        }

        tracing::debug!(rows = rows.len(), pages, "Fetched all pages");
        Ok(rows)
    }

    /// Execute a single `call_kw` request with a given session.
    async fn call_search_read<T: DeserializeOwned>(
        &self,
        session: &SessionHandle,
        query: &SearchRead,
    ) -> Result<Vec<T>, OdooError> {
        let request = RpcRequest::call(query.params());

        let response = self
            .inner
            .http
            .post(self.inner.config.service_url.clone())
            .header(reqwest::header::COOKIE, session.cookie())
            .header(SESSION_HEADER, session.token())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(OdooError::SessionExpired);
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), model = %query.model, "Odoo returned an error status");
            return Err(OdooError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let envelope: RpcResponse = serde_json::from_slice(&body)?;
        let result = match envelope.into_result() {
            Ok(result) => result,
            Err(error) if error.is_session_error() => return Err(OdooError::SessionExpired),
            Err(error) => {
                tracing::warn!(
                    code = error.code,
                    detail = %error.detail(),
                    model = %query.model,
                    "Odoo returned a JSON-RPC error"
                );
                return Err(OdooError::Remote {
                    code: error.code,
                    message: error.detail(),
                });
            }
        };

        serde_json::from_value(result)
            .map_err(|e| OdooError::Decode(format!("{}: {e}", query.model)))
    }
}
