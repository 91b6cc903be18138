//! Bridge configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ODOO_LOGIN_URL` - Odoo session endpoint (e.g. `https://erp.example.com/web/session/authenticate`)
//! - `ODOO_SERVICE_URL` - Odoo dataset endpoint (e.g. `https://erp.example.com/web/dataset/call_kw`)
//! - `ODOO_DB` - Odoo database name
//! - `ODOO_USER` - Service account login
//! - `ODOO_PASSWORD` - Service account password
//!
//! ## Optional
//! - `BRIDGE_HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `ODOO_TIMEOUT_SECS` - Per-call timeout for Odoo requests (default: 15, max 120)
//! - `ODOO_PAGE_SIZE` - Rows per `search_read` page when fetching ledger lines (default: 500)
//! - `ODOO_EXTERNAL_ID_FIELD` - `res.users` field holding the storefront id (default: `x_external_id`)
//! - `ODOO_RECEIVABLE_ACCOUNT_TYPE` - `account.account` type of receivables (default: `asset_receivable`)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins; any origin when unset
//! - `RATE_LIMIT_PER_SECOND` - Seconds per replenished credit-check token (default: 1)
//! - `RATE_LIMIT_BURST` - Credit-check burst size per client IP (default: 50)
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for plain text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MAX_TIMEOUT_SECS: u64 = 120;
const MAX_PAGE_SIZE: u32 = 10_000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

/// Bridge application configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Odoo connection and schema settings
    pub odoo: OdooConfig,
    /// Inbound HTTP settings
    pub http: HttpConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Odoo JSON-RPC configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct OdooConfig {
    /// `/web/session/authenticate` endpoint
    pub login_url: Url,
    /// `/web/dataset/call_kw` endpoint
    pub service_url: Url,
    /// Database name sent with the login request
    pub database: String,
    /// Service account login
    pub user: String,
    /// Service account password
    pub password: SecretString,
    /// Timeout applied to every outbound call
    pub timeout: Duration,
    /// Page size for paginated `search_read`
    pub page_size: u32,
    /// Field on `res.users` that stores the storefront customer id
    pub external_id_field: String,
    /// `account_type` value of receivable accounts
    pub receivable_account_type: String,
}

impl std::fmt::Debug for OdooConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdooConfig")
            .field("login_url", &self.login_url.as_str())
            .field("service_url", &self.service_url.as_str())
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .field("external_id_field", &self.external_id_field)
            .field("receivable_account_type", &self.receivable_account_type)
            .finish()
    }
}

/// Inbound HTTP configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Allowed CORS origins; empty means any origin
    pub cors_allowed_origins: Vec<String>,
    /// Seconds between replenished rate-limit tokens
    pub rate_limit_per_second: u64,
    /// Rate-limit burst size
    pub rate_limit_burst: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: Vec::new(),
            rate_limit_per_second: 1,
            rate_limit_burst: 50,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the Odoo password looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BridgeConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let host = env.parsed_or("BRIDGE_HOST", "127.0.0.1")?;
        let port = env.parsed_or("PORT", "3000")?;
        let odoo = OdooConfig::from_env(&env)?;
        let http = HttpConfig::from_env(&env)?;
        let log_format = match env.optional("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        };

        Ok(Self {
            host,
            port,
            odoo,
            http,
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl OdooConfig {
    fn from_env<F>(env: &Env<'_, F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = env.parsed_or("ODOO_TIMEOUT_SECS", "15")?;
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::InvalidEnvVar(
                "ODOO_TIMEOUT_SECS".to_string(),
                format!("must be between 1 and {MAX_TIMEOUT_SECS}"),
            ));
        }

        let page_size: u32 = env.parsed_or("ODOO_PAGE_SIZE", "500")?;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::InvalidEnvVar(
                "ODOO_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        Ok(Self {
            login_url: env.url("ODOO_LOGIN_URL")?,
            service_url: env.url("ODOO_SERVICE_URL")?,
            database: env.required("ODOO_DB")?,
            user: env.required("ODOO_USER")?,
            password: env.validated_secret("ODOO_PASSWORD")?,
            timeout: Duration::from_secs(timeout_secs),
            page_size,
            external_id_field: env.or_default("ODOO_EXTERNAL_ID_FIELD", "x_external_id"),
            receivable_account_type: env
                .or_default("ODOO_RECEIVABLE_ACCOUNT_TYPE", "asset_receivable"),
        })
    }
}

impl HttpConfig {
    fn from_env<F>(env: &Env<'_, F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cors_allowed_origins = env
            .optional("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_per_second: u64 = env.parsed_or("RATE_LIMIT_PER_SECOND", "1")?;
        let rate_limit_burst: u32 = env.parsed_or("RATE_LIMIT_BURST", "50")?;
        if rate_limit_per_second == 0 || rate_limit_burst == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "RATE_LIMIT_PER_SECOND/RATE_LIMIT_BURST".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            cors_allowed_origins,
            rate_limit_per_second,
            rate_limit_burst,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Typed accessors over a key lookup.
struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default.
    fn parsed_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a required absolute http(s) URL.
    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        let url = Url::parse(self.required(key)?.trim())
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }

    /// Load a required secret and reject obvious placeholders.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let secret = SecretString::from(self.required(key)?);
        validate_not_placeholder(&secret, key)?;
        Ok(secret)
    }
}

/// Validate that a secret is not a copied-in placeholder value.
fn validate_not_placeholder(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.expose_secret().to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("ODOO_LOGIN_URL", "https://erp.test/web/session/authenticate"),
            ("ODOO_SERVICE_URL", "https://erp.test/web/dataset/call_kw"),
            ("ODOO_DB", "db-test"),
            ("ODOO_USER", "bridge"),
            ("ODOO_PASSWORD", "q8Lw2vNz5rT0"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<BridgeConfig, ConfigError> {
        BridgeConfig::from_lookup(|key| env.get(key).map(ToString::to_string))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.odoo.timeout, Duration::from_secs(15));
        assert_eq!(config.odoo.page_size, 500);
        assert_eq!(config.odoo.external_id_field, "x_external_id");
        assert_eq!(config.odoo.receivable_account_type, "asset_receivable");
        assert!(config.http.cors_allowed_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Plain);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("PORT", "8080");
        env.insert("ODOO_PAGE_SIZE", "80");
        env.insert("CORS_ALLOWED_ORIGINS", "https://a.test, https://b.test,");
        env.insert("LOG_FORMAT", "json");

        let config = load(&env).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.odoo.page_size, 80);
        assert_eq!(
            config.http.cors_allowed_origins,
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_required() {
        let mut env = base_env();
        env.remove("ODOO_DB");

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "ODOO_DB"));
    }

    #[test]
    fn test_invalid_url() {
        let mut env = base_env();
        env.insert("ODOO_SERVICE_URL", "ftp://erp.test/call");
        assert!(matches!(load(&env), Err(ConfigError::InvalidEnvVar(_, _))));

        env.insert("ODOO_SERVICE_URL", "not a url");
        assert!(matches!(load(&env), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_out_of_range_numbers() {
        let mut env = base_env();
        env.insert("ODOO_TIMEOUT_SECS", "0");
        assert!(matches!(load(&env), Err(ConfigError::InvalidEnvVar(_, _))));

        let mut env = base_env();
        env.insert("ODOO_PAGE_SIZE", "20000");
        assert!(matches!(load(&env), Err(ConfigError::InvalidEnvVar(_, _))));

        let mut env = base_env();
        env.insert("RATE_LIMIT_BURST", "0");
        assert!(matches!(load(&env), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_placeholder_password_rejected() {
        let mut env = base_env();
        env.insert("ODOO_PASSWORD", "changeme123");
        assert!(matches!(load(&env), Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_odoo_config_debug_redacts_password() {
        let config = load(&base_env()).unwrap();
        let debug_output = format!("{:?}", config.odoo);

        assert!(debug_output.contains("db-test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("q8Lw2vNz5rT0"));
    }
}
