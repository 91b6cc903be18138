//! Integration tests for the Odoo credit bridge.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p odoo-bridge-integration-tests
//! ```
//!
//! Each test starts the full router on `127.0.0.1:0` against a `wiremock`
//! server playing Odoo, then calls it over HTTP with `reqwest`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use odoo_bridge_server::config::BridgeConfig;
use odoo_bridge_server::routes;
use odoo_bridge_server::state::AppState;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_PATH: &str = "/web/session/authenticate";
const SERVICE_PATH: &str = "/web/dataset/call_kw";

/// A customer known to the fake Odoo.
struct Customer {
    external_id: String,
    partner: i64,
    balances: Vec<f64>,
}

/// Builder for the Odoo data a test runs against.
#[derive(Default)]
pub struct FakeOdoo {
    customers: Vec<Customer>,
    failing_ledgers: Vec<i64>,
    slow_ledgers: Vec<(i64, Duration)>,
    reject_login: bool,
}

impl FakeOdoo {
    /// Start with an Odoo that knows no customers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user linked to `partner` whose receivable lines carry `balances`.
    #[must_use]
    pub fn customer(mut self, external_id: &str, partner: i64, balances: &[f64]) -> Self {
        self.customers.push(Customer {
            external_id: external_id.to_string(),
            partner,
            balances: balances.to_vec(),
        });
        self
    }

    /// Make ledger reads for `partner` fail with a JSON-RPC server error.
    #[must_use]
    pub fn failing_ledger(mut self, partner: i64) -> Self {
        self.failing_ledgers.push(partner);
        self
    }

    /// Delay ledger reads for `partner` by `delay`.
    #[must_use]
    pub fn slow_ledger(mut self, partner: i64, delay: Duration) -> Self {
        self.slow_ledgers.push((partner, delay));
        self
    }

    /// Reject the service account login.
    #[must_use]
    pub const fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    async fn mount(self, server: &MockServer) {
        let login = if self.reject_login {
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": 200,
                    "message": "Odoo Server Error",
                    "data": {"name": "odoo.exceptions.AccessDenied", "message": "Access Denied"}
                }
            })
        } else {
            json!({"jsonrpc": "2.0", "id": null, "result": {"uid": 2, "session_id": "it-session"}})
        };
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(login))
            .mount(server)
            .await;

        // Unknown identities
        Mock::given(method("POST"))
            .and(path(SERVICE_PATH))
            .and(body_partial_json(json!({"params": {"model": "res.users"}})))
            .respond_with(rows(&json!([])))
            .with_priority(10)
            .mount(server)
            .await;

        for (index, customer) in self.customers.iter().enumerate() {
            let user_id = i64::try_from(index).unwrap_or(i64::MAX) + 100;
            Mock::given(method("POST"))
                .and(path(SERVICE_PATH))
                .and(body_partial_json(json!({
                    "params": {
                        "model": "res.users",
                        "args": [[["x_external_id", "=", customer.external_id]]]
                    }
                })))
                .respond_with(rows(&json!([
                    {"id": user_id, "partner_id": [customer.partner, "Customer"]}
                ])))
                .mount(server)
                .await;

            let lines: Vec<Value> = customer
                .balances
                .iter()
                .map(|balance| json!({"balance": balance}))
                .collect();
            let response = if self.failing_ledgers.contains(&customer.partner) {
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": {"code": 200, "message": "Odoo Server Error"}
                }))
            } else {
                rows(&Value::Array(lines))
            };
            let response = match self
                .slow_ledgers
                .iter()
                .find(|(partner, _)| *partner == customer.partner)
            {
                Some((_, delay)) => response.set_delay(*delay),
                None => response,
            };
            Mock::given(method("POST"))
                .and(path(SERVICE_PATH))
                .and(body_partial_json(json!({
                    "params": {
                        "model": "account.move.line",
                        "args": [[
                            ["partner_id", "=", customer.partner],
                            ["account_id.account_type", "=", "asset_receivable"]
                        ]]
                    }
                })))
                .respond_with(response)
                .mount(server)
                .await;
        }
    }
}

fn rows(rows: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": null, "result": rows}))
}

/// A running bridge and the fake Odoo behind it.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub odoo: MockServer,
}

impl TestContext {
    /// Start the bridge with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be started.
    pub async fn start(odoo: FakeOdoo) -> Self {
        Self::start_with(odoo, &[]).await
    }

    /// Start the bridge with extra environment settings.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid or the server cannot be started.
    pub async fn start_with(odoo: FakeOdoo, overrides: &[(&str, &str)]) -> Self {
        let server = MockServer::start().await;
        odoo.mount(&server).await;

        let mut env: HashMap<String, String> = HashMap::from([
            ("ODOO_LOGIN_URL".to_string(), format!("{}{LOGIN_PATH}", server.uri())),
            ("ODOO_SERVICE_URL".to_string(), format!("{}{SERVICE_PATH}", server.uri())),
            ("ODOO_DB".to_string(), "bridge-it".to_string()),
            ("ODOO_USER".to_string(), "bridge".to_string()),
            ("ODOO_PASSWORD".to_string(), "q8Lw2vNz5rT0".to_string()),
            ("ODOO_TIMEOUT_SECS".to_string(), "5".to_string()),
        ]);
        for (key, value) in overrides {
            env.insert((*key).to_string(), (*value).to_string());
        }

        let config =
            BridgeConfig::from_lookup(|key| env.get(key).cloned()).expect("valid test configuration");
        let state = AppState::new(config).expect("application state");
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server");
        });

        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            odoo: server,
        }
    }

    /// Call a credit endpoint with the given query pairs.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn check_credit_at(&self, route: &str, query: &[(&str, &str)]) -> reqwest::Response {
        let url = reqwest::Url::parse_with_params(&format!("{}{route}", self.base_url), query)
            .expect("valid bridge url");
        self.client
            .get(url)
            .send()
            .await
            .expect("request to bridge")
    }

    /// Call `/check-credit` with all three parameters.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn check_credit(
        &self,
        external_id: &str,
        company: &str,
        importe: &str,
    ) -> reqwest::Response {
        self.check_credit_at(
            "/check-credit",
            &[
                ("external_id", external_id),
                ("company", company),
                ("importe", importe),
            ],
        )
        .await
    }

    /// GET a path on the bridge.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, route: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{route}", self.base_url))
            .send()
            .await
            .expect("request to bridge")
    }
}
