//! Odoo authentication check.
//!
//! # Usage
//!
//! ```bash
//! odoo-bridge auth
//! ```
//!
//! # Environment Variables
//!
//! - `ODOO_LOGIN_URL`, `ODOO_SERVICE_URL`, `ODOO_DB`, `ODOO_USER`, `ODOO_PASSWORD`

use odoo_bridge_server::config::BridgeConfig;
use odoo_bridge_server::odoo::OdooClient;

use super::CommandError;

/// Log in with the configured service account.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or Odoo rejects the
/// credentials.
pub async fn run() -> Result<(), CommandError> {
    let config = BridgeConfig::from_env()?;
    let database = config.odoo.database.clone();
    let user = config.odoo.user.clone();

    tracing::info!("Authenticating with Odoo...");
    let client = OdooClient::new(config.odoo)?;
    client.session().await?;

    tracing::info!(%database, %user, "Odoo accepted the service account");
    Ok(())
}
