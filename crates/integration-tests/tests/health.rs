//! Health and request-correlation checks.

#![allow(clippy::unwrap_used)]

use odoo_bridge_integration_tests::{FakeOdoo, TestContext};
use reqwest::StatusCode;

#[tokio::test]
async fn test_liveness() {
    let ctx = TestContext::start(FakeOdoo::new()).await;

    let response = ctx.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_readiness_follows_odoo_login() {
    let ready = TestContext::start(FakeOdoo::new()).await;
    assert_eq!(ready.get("/health/ready").await.status(), StatusCode::OK);

    let not_ready = TestContext::start(FakeOdoo::new().rejecting_login()).await;
    assert_eq!(
        not_ready.get("/health/ready").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let ctx = TestContext::start(FakeOdoo::new()).await;

    let response = ctx
        .client
        .get(format!("{}/health", ctx.base_url))
        .header("x-request-id", "storefront-req-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "storefront-req-1");

    let response = ctx.get("/health").await;
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn test_session_is_reused_across_requests() {
    let ctx = TestContext::start(FakeOdoo::new().customer("ext-42", 900, &[10.0])).await;

    for _ in 0..3 {
        let response = ctx.check_credit("ext-42", "900", "1.00").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let logins = ctx
        .odoo
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/web/session/authenticate")
        .count();
    assert_eq!(logins, 1);
}
