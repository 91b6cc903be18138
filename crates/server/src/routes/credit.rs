//! Credit check route handler.
//!
//! The storefront asks whether a logged-in customer may pay an order on
//! credit. Parameters arrive as query strings, with names kept from the
//! existing storefront integration.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use odoo_bridge_core::{CreditDecision, CreditRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::credit::CreditError;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters of a credit check.
///
/// Every field is optional at this layer so a missing parameter produces the
/// same validation error as an empty one.
#[derive(Debug, Default, Deserialize)]
pub struct CheckCreditQuery {
    pub external_id: Option<String>,
    pub company: Option<String>,
    pub importe: Option<String>,
}

/// Credit check answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCreditResponse {
    /// Whether the balance covers the requested amount.
    pub credito_valido: bool,
    /// Receivable balance of the customer's account.
    #[serde(with = "rust_decimal::serde::float")]
    pub credito_disponible: Decimal,
}

impl From<CreditDecision> for CheckCreditResponse {
    fn from(decision: CreditDecision) -> Self {
        Self {
            credito_valido: decision.sufficient,
            credito_disponible: decision.available,
        }
    }
}

/// Check a customer's credit against their Odoo receivables.
///
/// `GET /check-credit?external_id=..&company=..&importe=..`
#[instrument(skip(state, query))]
pub async fn check_credit(
    State(state): State<AppState>,
    query: std::result::Result<Query<CheckCreditQuery>, QueryRejection>,
) -> Result<Json<CheckCreditResponse>> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let request = CreditRequest::parse(
        query.external_id.as_deref(),
        query.company.as_deref(),
        query.importe.as_deref(),
    )
    .map_err(CreditError::from)?;

    let decision = state.credit().check_credit(&request).await?;
    Ok(Json(decision.into()))
}
