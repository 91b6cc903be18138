//! One-off credit check.
//!
//! Runs the same checks as `GET /check-credit` and prints the response body
//! the server would send.
//!
//! # Usage
//!
//! ```bash
//! odoo-bridge check-credit -e ext-42 -c 900 -i 150.00
//! ```

use odoo_bridge_core::CreditRequest;
use odoo_bridge_server::config::BridgeConfig;
use odoo_bridge_server::credit::{CreditError, CreditService};
use odoo_bridge_server::odoo::OdooClient;
use odoo_bridge_server::routes::credit::CheckCreditResponse;

use super::CommandError;

/// Check a customer's credit and print the decision as JSON.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, the customer is unknown or
/// claims another account, or Odoo fails.
pub async fn run(external_id: &str, company: &str, importe: &str) -> Result<(), CommandError> {
    let request = CreditRequest::parse(Some(external_id), Some(company), Some(importe))
        .map_err(CreditError::from)?;

    let config = BridgeConfig::from_env()?;
    let service = CreditService::new(OdooClient::new(config.odoo)?);

    let decision = service.check_credit(&request).await?;
    let body = serde_json::to_string_pretty(&CheckCreditResponse::from(decision))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{body}");
    }
    Ok(())
}
