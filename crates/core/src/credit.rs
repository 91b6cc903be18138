//! Credit check rules.
//!
//! Everything here is pure: parsing of the caller's request, the account
//! authorization rule, summing ledger balances, and the sufficiency rule. The
//! server crate supplies the Odoo lookups in between.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{Amount, AmountError, ExternalId, PartnerId};

/// Errors caused by bad or missing caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required parameters were absent or empty.
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    /// The claimed account is not an integer.
    #[error("company must be an integer account id")]
    InvalidCompany,

    /// The requested amount could not be parsed.
    #[error("invalid importe: {0}")]
    InvalidAmount(#[from] AmountError),
}

/// A validated credit check request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRequest {
    /// Storefront identity of the customer asking for credit.
    pub external_id: ExternalId,
    /// Account the caller claims to act for. Never trusted on its own.
    pub claimed_account: PartnerId,
    /// Amount the customer wants to charge against their credit.
    pub requested: Amount,
}

impl CreditRequest {
    /// Validate raw request parameters.
    ///
    /// Presence is checked first for all three parameters so the error lists
    /// every missing one. Empty strings count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first problem found.
    pub fn parse(
        external_id: Option<&str>,
        company: Option<&str>,
        importe: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let (external_id, company, importe) =
            match (present(external_id), present(company), present(importe)) {
                (Some(e), Some(c), Some(i)) => (e, c, i),
                (e, c, i) => {
                    let missing = [("external_id", e), ("company", c), ("importe", i)]
                        .into_iter()
                        .filter(|(_, value)| value.is_none())
                        .map(|(name, _)| name)
                        .collect();
                    return Err(ValidationError::MissingParameters(missing));
                }
            };

        let external_id = ExternalId::parse(external_id)
            .map_err(|_| ValidationError::MissingParameters(vec!["external_id"]))?;
        let claimed_account = company
            .parse::<PartnerId>()
            .map_err(|_| ValidationError::InvalidCompany)?;
        let requested = Amount::parse(importe)?;

        Ok(Self {
            external_id,
            claimed_account,
            requested,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// The caller claimed an account other than the one their identity resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("claimed account {claimed} does not match resolved account {resolved}")]
pub struct AccountMismatch {
    /// Account supplied by the caller.
    pub claimed: PartnerId,
    /// Account resolved from the caller's external identity.
    pub resolved: PartnerId,
}

/// Check a caller's claimed account against the account resolved from Odoo.
///
/// # Errors
///
/// Returns [`AccountMismatch`] when the two differ.
pub fn authorize(claimed: PartnerId, resolved: PartnerId) -> Result<(), AccountMismatch> {
    if claimed == resolved {
        Ok(())
    } else {
        Err(AccountMismatch { claimed, resolved })
    }
}

/// Sum ledger line balances.
///
/// Returns `None` on decimal overflow. An empty iterator sums to zero.
pub fn total_balance<I>(balances: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    balances
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Outcome of a credit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditDecision {
    /// Whether the available balance covers the requested amount.
    pub sufficient: bool,
    /// Sum of the account's receivable ledger lines.
    pub available: Decimal,
}

/// Decide whether `available` covers `requested`. The threshold is inclusive.
#[must_use]
pub fn judge(available: Decimal, requested: Amount) -> CreditDecision {
    CreditDecision {
        sufficient: available >= requested.value(),
        available,
    }
}
