//! Credit authorization engine.
//!
//! Answers "may this storefront customer charge this amount on credit?":
//!
//! 1. Resolve the customer's Odoo partner from their external identity.
//! 2. Check the partner the caller claimed against the resolved one.
//! 3. Sum the partner's receivable ledger lines.
//! 4. Compare the sum against the requested amount.
//!
//! The caller's claimed account is only ever compared. Every Odoo lookup uses
//! the partner resolved in step 1.

use odoo_bridge_core::{
    AccountMismatch, CreditDecision, CreditRequest, ExternalId, PartnerId, ValidationError,
    authorize, judge, total_balance,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use crate::odoo::{LedgerLine, OdooClient, OdooError, SearchRead, UserRecord};

/// Odoo model holding users.
const USER_MODEL: &str = "res.users";
/// Odoo model holding journal items.
const LEDGER_LINE_MODEL: &str = "account.move.line";

/// Errors from a credit check.
#[derive(Debug, Error)]
pub enum CreditError {
    /// Caller input was missing or malformed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No Odoo user (or no linked partner) for the external identity.
    #[error("No Odoo account for external id {0}")]
    NotFound(ExternalId),

    /// The caller claimed someone else's account.
    #[error("Authorization denied: {0}")]
    Denied(#[from] AccountMismatch),

    /// Odoo could not be reached or answered unexpectedly.
    #[error("Odoo error: {0}")]
    Upstream(#[from] OdooError),
}

/// Credit checks against Odoo receivables.
#[derive(Clone)]
pub struct CreditService {
    odoo: OdooClient,
}

impl CreditService {
    /// Create a credit service over an Odoo client.
    #[must_use]
    pub const fn new(odoo: OdooClient) -> Self {
        Self { odoo }
    }

    /// Resolve the billing partner linked to an external identity.
    ///
    /// At most two users are fetched so a duplicated identity can be
    /// reported. When that happens the lowest user ID wins.
    ///
    /// # Errors
    ///
    /// Returns `CreditError::NotFound` if no user carries the identity or the
    /// user has no partner, `CreditError::Upstream` if the lookup fails.
    #[instrument(skip(self, external_id), fields(external_id = %external_id))]
    pub async fn resolve_account(&self, external_id: &ExternalId) -> Result<PartnerId, CreditError> {
        let query = SearchRead::new(USER_MODEL)
            .filter(
                &self.odoo.config().external_id_field,
                "=",
                external_id.as_str(),
            )
            .fields(UserRecord::FIELDS)
            .limit(2)
            .order("id asc");

        let users: Vec<UserRecord> = self.odoo.search_read(&query).await?;

        let mut users = users.into_iter();
        let Some(user) = users.next() else {
            tracing::info!("No Odoo user for external id");
            return Err(CreditError::NotFound(external_id.clone()));
        };

        if let Some(duplicate) = users.next() {
            tracing::warn!(
                first_user = %user.id,
                duplicate_user = %duplicate.id,
                "External id matches more than one Odoo user, using the lowest id"
            );
        }

        match user.partner_id {
            Some(partner) => Ok(partner.id),
            None => {
                tracing::warn!(user = %user.id, "Odoo user has no linked partner");
                Err(CreditError::NotFound(external_id.clone()))
            }
        }
    }

    /// Sum every receivable ledger line of a partner.
    ///
    /// # Errors
    ///
    /// Returns `CreditError::Upstream` if any page of lines fails to load or
    /// the sum overflows.
    #[instrument(skip(self, partner), fields(partner = %partner))]
    pub async fn aggregate_receivables(&self, partner: PartnerId) -> Result<Decimal, CreditError> {
        let query = SearchRead::new(LEDGER_LINE_MODEL)
            .filter("partner_id", "=", partner.as_i64())
            .filter(
                "account_id.account_type",
                "=",
                self.odoo.config().receivable_account_type.as_str(),
            )
            .fields(LedgerLine::FIELDS)
            .order("id asc");

        let lines: Vec<LedgerLine> = self.odoo.search_read_all(&query).await?;
        let line_count = lines.len();

        let total = total_balance(lines.into_iter().map(|line| line.balance)).ok_or_else(|| {
            OdooError::Decode(format!("{LEDGER_LINE_MODEL}: balance sum overflow"))
        })?;

        tracing::debug!(lines = line_count, %total, "Aggregated receivables");
        Ok(total)
    }

    /// Run the whole credit check for a validated request.
    ///
    /// # Errors
    ///
    /// Returns `CreditError::NotFound` for an unknown identity,
    /// `CreditError::Denied` when the claimed account is not the customer's,
    /// and `CreditError::Upstream` for Odoo failures.
    #[instrument(
        skip(self, request),
        fields(external_id = %request.external_id, claimed = %request.claimed_account)
    )]
    pub async fn check_credit(&self, request: &CreditRequest) -> Result<CreditDecision, CreditError> {
        let resolved = self.resolve_account(&request.external_id).await?;

        if let Err(mismatch) = authorize(request.claimed_account, resolved) {
            tracing::warn!(
                claimed = %mismatch.claimed,
                resolved = %mismatch.resolved,
                "Claimed account does not match the customer's account"
            );
            return Err(mismatch.into());
        }

        let available = self.aggregate_receivables(resolved).await?;
        let decision = judge(available, request.requested);

        tracing::info!(
            sufficient = decision.sufficient,
            requested = %request.requested,
            "Credit check completed"
        );
        Ok(decision)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BridgeConfig;

    async fn odoo_with(users: Value, ledger_pages: &[Value], page_size: u32) -> (MockServer, CreditService) {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/web/session/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {"uid": 2, "session_id": "s1"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/web/dataset/call_kw"))
            .and(body_partial_json(json!({"params": {"model": "res.users"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": users})))
            .mount(&server)
            .await;

        for (index, page) in ledger_pages.iter().enumerate() {
            let offset = u32::try_from(index).unwrap() * page_size;
            Mock::given(method("POST"))
                .and(path("/web/dataset/call_kw"))
                .and(body_partial_json(json!({
                    "params": {"model": "account.move.line", "kwargs": {"offset": offset}}
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": page})))
                .mount(&server)
                .await;
        }

        let login = format!("{}/web/session/authenticate", server.uri());
        let service = format!("{}/web/dataset/call_kw", server.uri());
        let page_size = page_size.to_string();
        let env = HashMap::from([
            ("ODOO_LOGIN_URL", login.as_str()),
            ("ODOO_SERVICE_URL", service.as_str()),
            ("ODOO_DB", "db-test"),
            ("ODOO_USER", "bridge"),
            ("ODOO_PASSWORD", "q8Lw2vNz5rT0"),
            ("ODOO_PAGE_SIZE", page_size.as_str()),
        ]);
        let config = BridgeConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap();
        let service = CreditService::new(OdooClient::new(config.odoo).unwrap());

        (server, service)
    }

    fn request(company: &str, importe: &str) -> CreditRequest {
        CreditRequest::parse(Some("ext-42"), Some(company), Some(importe)).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_sufficient_credit() {
        let (_server, service) = odoo_with(
            json!([{"id": 7, "partner_id": [900, "Garys"]}]),
            &[json!([{"balance": 120.0}, {"balance": 80.0}])],
            500,
        )
        .await;

        let decision = service.check_credit(&request("900", "150.00")).await.unwrap();
        assert!(decision.sufficient);
        assert_eq!(decision.available, dec("200"));
    }

    #[tokio::test]
    async fn test_insufficient_credit() {
        let (_server, service) = odoo_with(
            json!([{"id": 7, "partner_id": [900, "Garys"]}]),
            &[json!([{"balance": 100.0}])],
            500,
        )
        .await;

        let decision = service.check_credit(&request("900", "150.00")).await.unwrap();
        assert!(!decision.sufficient);
        assert_eq!(decision.available, dec("100"));
    }

    #[tokio::test]
    async fn test_mismatched_company_is_denied_before_ledger_lookup() {
        let (_server, service) = odoo_with(
            json!([{"id": 7, "partner_id": [900, "Garys"]}]),
            &[],
            500,
        )
        .await;

        let err = service.check_credit(&request("901", "1")).await.unwrap_err();
        assert!(matches!(
            err,
            CreditError::Denied(AccountMismatch { claimed, resolved })
                if claimed == PartnerId::new(901) && resolved == PartnerId::new(900)
        ));
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let (_server, service) = odoo_with(json!([]), &[], 500).await;

        let err = service.check_credit(&request("900", "1")).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound(ref id) if id.as_str() == "ext-42"));
    }

    #[tokio::test]
    async fn test_user_without_partner_is_not_found() {
        let (_server, service) =
            odoo_with(json!([{"id": 7, "partner_id": false}]), &[], 500).await;

        let err = service
            .resolve_account(&ExternalId::parse("ext-42").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_identity_uses_first_user() {
        let (_server, service) = odoo_with(
            json!([
                {"id": 7, "partner_id": [900, "Garys"]},
                {"id": 12, "partner_id": [955, "Garys (dup)"]}
            ]),
            &[],
            500,
        )
        .await;

        let partner = service
            .resolve_account(&ExternalId::parse("ext-42").unwrap())
            .await
            .unwrap();
        assert_eq!(partner, PartnerId::new(900));
    }

    #[tokio::test]
    async fn test_empty_ledger_sums_to_zero() {
        let (_server, service) = odoo_with(
            json!([{"id": 7, "partner_id": [900, "Garys"]}]),
            &[json!([])],
            500,
        )
        .await;

        let decision = service.check_credit(&request("900", "0")).await.unwrap();
        assert!(decision.sufficient);
        assert_eq!(decision.available, Decimal::ZERO);

        let decision = service.check_credit(&request("900", "0.01")).await.unwrap();
        assert!(!decision.sufficient);
    }

    #[tokio::test]
    async fn test_aggregation_spans_pages() {
        let (_server, service) = odoo_with(
            json!([{"id": 7, "partner_id": [900, "Garys"]}]),
            &[
                json!([{"balance": 50.25}, {"balance": 49.75}]),
                json!([{"balance": 0.1}, {"balance": 0.2}]),
                json!([{"balance": -10}]),
            ],
            2,
        )
        .await;

        let total = service.aggregate_receivables(PartnerId::new(900)).await.unwrap();
        assert_eq!(total, dec("90.3"));
    }

    #[tokio::test]
    async fn test_ledger_failure_fails_the_check() {
        let (server, service) = odoo_with(
            json!([{"id": 7, "partner_id": [900, "Garys"]}]),
            &[json!([{"balance": 50.0}, {"balance": 50.0}])],
            2,
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/web/dataset/call_kw"))
            .and(body_partial_json(json!({
                "params": {"model": "account.move.line", "kwargs": {"offset": 2}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": 200, "message": "Odoo Server Error"}
            })))
            .mount(&server)
            .await;

        let err = service.check_credit(&request("900", "1")).await.unwrap_err();
        assert!(matches!(err, CreditError::Upstream(OdooError::Remote { code: 200, .. })));
    }
}
