//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::credit::CreditService;
use crate::odoo::{OdooClient, OdooError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// Odoo client, the credit service, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BridgeConfig,
    odoo: OdooClient,
    credit: CreditService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// No Odoo call is made here; the first request authenticates.
    ///
    /// # Errors
    ///
    /// Returns an error if the Odoo HTTP client cannot be built.
    pub fn new(config: BridgeConfig) -> Result<Self, OdooError> {
        let odoo = OdooClient::new(config.odoo.clone())?;
        let credit = CreditService::new(odoo.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                odoo,
                credit,
            }),
        })
    }

    /// Get a reference to the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Get a reference to the Odoo client.
    #[must_use]
    pub fn odoo(&self) -> &OdooClient {
        &self.inner.odoo
    }

    /// Get a reference to the credit service.
    #[must_use]
    pub fn credit(&self) -> &CreditService {
        &self.inner.credit
    }
}
