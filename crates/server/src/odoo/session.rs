//! Odoo session authentication and caching.
//!
//! Odoo keeps session lifetime on the server side, so the cache holds the
//! handle until a call reports it rejected. There is no local expiry.

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use super::{OdooError, RpcRequest, RpcResponse};
use crate::config::OdooConfig;

/// Name of the cookie Odoo stores the session token in.
const SESSION_COOKIE: &str = "session_id";

/// Authenticated Odoo session token.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct SessionHandle(SecretString);

impl SessionHandle {
    /// Wrap a raw session token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `X-Openerp-Session-Id` header.
    pub(crate) fn token(&self) -> &str {
        self.0.expose_secret()
    }

    /// The `Cookie` header value carrying this session.
    pub(crate) fn cookie(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.token())
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl Eq for SessionHandle {}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionHandle([REDACTED])")
    }
}

/// Parameters of `/web/session/authenticate`.
#[derive(Serialize)]
struct AuthParams<'a> {
    db: &'a str,
    login: &'a str,
    password: &'a str,
}

/// The parts of the authentication result the bridge relies on.
#[derive(Deserialize)]
struct AuthResult {
    #[serde(default)]
    uid: serde_json::Value,
    #[serde(default)]
    session_id: Option<String>,
}

/// Authenticate with Odoo using the configured service credentials.
///
/// The session token is read from `result.session_id` when Odoo includes it
/// and from the `session_id` cookie otherwise.
///
/// # Errors
///
/// Returns `OdooError::AuthenticationFailed` if Odoo rejects the credentials
/// or returns no session, `OdooError::Timeout`/`OdooError::Transport` if Odoo
/// is unreachable.
#[instrument(skip(client, config), fields(db = %config.database, login = %config.user))]
pub async fn authenticate(
    client: &reqwest::Client,
    config: &OdooConfig,
) -> Result<SessionHandle, OdooError> {
    let request = RpcRequest::call(AuthParams {
        db: &config.database,
        login: &config.user,
        password: config.password.expose_secret(),
    });

    let response = client
        .post(config.login_url.clone())
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(OdooError::AuthenticationFailed(format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(OdooError::Status(status.as_u16()));
    }

    let cookie_session = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_from_set_cookie);

    let body = response.bytes().await?;
    let envelope: RpcResponse = serde_json::from_slice(&body)?;
    let result = envelope
        .into_result()
        .map_err(|error| OdooError::AuthenticationFailed(error.detail()))?;

    if !result.is_object() {
        return Err(OdooError::AuthenticationFailed(
            "credentials rejected".to_string(),
        ));
    }
    let result: AuthResult = serde_json::from_value(result)?;

    if result.uid.as_i64().is_none() {
        return Err(OdooError::AuthenticationFailed(
            "credentials rejected".to_string(),
        ));
    }

    let token = result
        .session_id
        .filter(|token| !token.is_empty())
        .or(cookie_session)
        .ok_or_else(|| OdooError::AuthenticationFailed("no session returned".to_string()))?;

    tracing::info!("Authenticated with Odoo");
    Ok(SessionHandle::new(token))
}

/// Extract the session token from one `Set-Cookie` header value.
fn session_from_set_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.trim().to_string())
}

/// Process-wide cache of the current Odoo session.
///
/// Reads are concurrent. Authentication is single-flight: callers that find
/// the cache empty queue on the refresh gate, and all but the first find the
/// fresh handle when they re-check.
#[derive(Default)]
pub struct SessionCache {
    current: RwLock<Option<SessionHandle>>,
    refresh: Mutex<()>,
}

impl SessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached handle, if any.
    pub async fn current(&self) -> Option<SessionHandle> {
        self.current.read().await.clone()
    }

    /// Return the cached handle or install one obtained from `authenticate`.
    ///
    /// # Errors
    ///
    /// Propagates the error from `authenticate`; the cache stays empty.
    pub async fn get_or_authenticate<F, Fut>(&self, authenticate: F) -> Result<SessionHandle, OdooError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SessionHandle, OdooError>>,
    {
        if let Some(handle) = self.current().await {
            return Ok(handle);
        }

        let _gate = self.refresh.lock().await;
        if let Some(handle) = self.current().await {
            return Ok(handle);
        }

        let handle = authenticate().await?;
        *self.current.write().await = Some(handle.clone());
        Ok(handle)
    }

    /// Discard `rejected` if it is still the cached handle.
    ///
    /// Returns `true` if the cache was cleared. A handle installed by another
    /// request after `rejected` was read is left in place.
    pub async fn invalidate(&self, rejected: &SessionHandle) -> bool {
        let mut current = self.current.write().await;
        if current.as_ref() == Some(rejected) {
            *current = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_session_from_set_cookie() {
        assert_eq!(
            session_from_set_cookie("session_id=abc123; Expires=Wed, 01 Jan 2031; Path=/; HttpOnly"),
            Some("abc123".to_string())
        );
        assert_eq!(session_from_set_cookie("frontend_lang=es_ES; Path=/"), None);
        assert_eq!(session_from_set_cookie("session_id=; Path=/"), None);
    }

    #[test]
    fn test_handle_debug_redacts_token() {
        let handle = SessionHandle::new("very-secret-token");
        assert_eq!(format!("{handle:?}"), "SessionHandle([REDACTED])");
        assert_eq!(handle.cookie(), "session_id=very-secret-token");
    }

    #[tokio::test]
    async fn test_cache_reuses_handle() {
        let cache = SessionCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let handle = cache
                .get_or_authenticate(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(SessionHandle::new("s1"))
                })
                .await
                .unwrap();
            assert_eq!(handle, SessionHandle::new("s1"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_is_single_flight() {
        let cache = Arc::new(SessionCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_authenticate(|| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(SessionHandle::new("shared"))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), SessionHandle::new("shared"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_is_compare_and_clear() {
        let cache = SessionCache::new();
        let stale = SessionHandle::new("stale");
        cache
            .get_or_authenticate(|| async { Ok(SessionHandle::new("fresh")) })
            .await
            .unwrap();

        assert!(!cache.invalidate(&stale).await);
        assert_eq!(cache.current().await, Some(SessionHandle::new("fresh")));

        assert!(cache.invalidate(&SessionHandle::new("fresh")).await);
        assert_eq!(cache.current().await, None);
    }

    #[tokio::test]
    async fn test_failed_authentication_leaves_cache_empty() {
        let cache = SessionCache::new();
        let result = cache
            .get_or_authenticate(|| async {
                Err(OdooError::AuthenticationFailed("Access Denied".to_string()))
            })
            .await;

        assert!(matches!(result, Err(OdooError::AuthenticationFailed(_))));
        assert!(cache.current().await.is_none());
    }
}
