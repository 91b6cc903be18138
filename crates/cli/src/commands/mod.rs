//! CLI subcommands.

pub mod auth;
pub mod check_credit;

use odoo_bridge_server::config::ConfigError;
use odoo_bridge_server::credit::CreditError;
use odoo_bridge_server::odoo::OdooError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Odoo call failed.
    #[error("Odoo error: {0}")]
    Odoo(#[from] OdooError),

    /// Credit check failed.
    #[error("{0}")]
    Credit(#[from] CreditError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
