//! The API client itself.
//!
//! Every public method maps 1:1 onto one node API operation. Methods
//! return the parsed JSON body as a `serde_json::Value`; callers that
//! need structure deserialize through [`crate::models`]. The operation
//! name baked into each method is what appears in protocol error
//! messages (`"Error calling Block: ..."`), so it must stay aligned
//! with the node's published operation naming.

use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;
use crate::models::CsrfToken;

/// Default per-request timeout. Cancellation/timeout policy lives
/// entirely here; the harness core never retries.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header the node checks on CSRF-protected calls.
const CSRF_HEADER: &str = "X-CSRF-TOKEN";

#[derive(Clone)]
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client against `base` (e.g. `http://localhost:6420`).
    pub fn new(base: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(ApiClient {
            base: base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL this client targets.
    pub fn base(&self) -> &str {
        &self.base
    }

    async fn dispatch(&self, op: &'static str, req: RequestBuilder) -> Result<Value, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(op, status = status.as_u16(), "api call completed");
        if !status.is_success() {
            return Err(ApiError::protocol(op, status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get(
        &self,
        op: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.http.get(&url);
        if !query.is_empty() {
            req = req.query(query);
        }
        self.dispatch(op, req).await
    }

    async fn post_form(
        &self,
        op: &'static str,
        path: &str,
        form: &[(&str, String)],
        csrf: Option<&str>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.http.post(&url).form(form);
        if let Some(token) = csrf.filter(|t| !t.is_empty()) {
            req = req.header(CSRF_HEADER, token);
        }
        self.dispatch(op, req).await
    }

    async fn post_json(
        &self,
        op: &'static str,
        path: &str,
        body: &Value,
        csrf: Option<&str>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.http.post(&url).json(body);
        if let Some(token) = csrf.filter(|t| !t.is_empty()) {
            req = req.header(CSRF_HEADER, token);
        }
        self.dispatch(op, req).await
    }

    // ── build / health ──────────────────────────────────────────────

    pub async fn version(&self) -> Result<Value, ApiError> {
        self.get("Version", "/api/v1/version", &[]).await
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        self.get("Health", "/api/v1/health", &[]).await
    }

    // ── wallet ──────────────────────────────────────────────────────

    pub async fn wallet_seed_verify(
        &self,
        seed: &str,
        csrf: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = serde_json::json!({ "seed": seed });
        self.post_json("WalletSeedVerify", "/api/v2/wallet/seed/verify", &body, csrf)
            .await
    }

    // ── balance / addresses ─────────────────────────────────────────

    pub async fn balance_get(&self, addrs: &str) -> Result<Value, ApiError> {
        self.get("BalanceGet", "/api/v1/balance", &[("addrs", addrs.to_string())])
            .await
    }

    pub async fn balance_post(&self, addrs: &str, csrf: Option<&str>) -> Result<Value, ApiError> {
        self.post_form(
            "BalancePost",
            "/api/v1/balance",
            &[("addrs", addrs.to_string())],
            csrf,
        )
        .await
    }

    pub async fn address_count(&self) -> Result<Value, ApiError> {
        self.get("AddressCount", "/api/v1/addresscount", &[]).await
    }

    pub async fn address_uxouts(&self, address: &str) -> Result<Value, ApiError> {
        self.get(
            "AddressUxouts",
            "/api/v1/address_uxouts",
            &[("address", address.to_string())],
        )
        .await
    }

    // ── blocks ──────────────────────────────────────────────────────

    pub async fn block_by_hash(&self, hash: &str) -> Result<Value, ApiError> {
        self.get("Block", "/api/v1/block", &[("hash", hash.to_string())])
            .await
    }

    pub async fn block_by_seq(&self, seq: u64) -> Result<Value, ApiError> {
        self.get("Block", "/api/v1/block", &[("seq", seq.to_string())])
            .await
    }

    pub async fn blocks_range(&self, start: u64, end: u64) -> Result<Value, ApiError> {
        self.get(
            "Blocks",
            "/api/v1/blocks",
            &[("start", start.to_string()), ("end", end.to_string())],
        )
        .await
    }

    pub async fn blocks_seqs(&self, seqs: &[u64]) -> Result<Value, ApiError> {
        let joined = seqs
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.get("Blocks", "/api/v1/blocks", &[("seqs", joined)]).await
    }

    pub async fn last_blocks(&self, num: u64) -> Result<Value, ApiError> {
        self.get("LastBlocks", "/api/v1/last_blocks", &[("num", num.to_string())])
            .await
    }

    // ── blockchain ──────────────────────────────────────────────────

    pub async fn blockchain_metadata(&self) -> Result<Value, ApiError> {
        self.get("BlockchainMetadata", "/api/v1/blockchain/metadata", &[])
            .await
    }

    pub async fn blockchain_progress(&self) -> Result<Value, ApiError> {
        self.get("BlockchainProgress", "/api/v1/blockchain/progress", &[])
            .await
    }

    pub async fn coin_supply(&self) -> Result<Value, ApiError> {
        self.get("CoinSupply", "/api/v1/coinSupply", &[]).await
    }

    // ── transactions ────────────────────────────────────────────────

    pub async fn transactions_get(
        &self,
        addrs: &str,
        confirmed: Option<bool>,
    ) -> Result<Value, ApiError> {
        let mut query = vec![("addrs", addrs.to_string())];
        if let Some(c) = confirmed {
            query.push(("confirmed", c.to_string()));
        }
        self.get("TransactionsGet", "/api/v1/transactions", &query).await
    }

    pub async fn transactions_post(
        &self,
        addrs: &str,
        confirmed: Option<bool>,
        csrf: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut form = vec![("addrs", addrs.to_string())];
        if let Some(c) = confirmed {
            form.push(("confirmed", c.to_string()));
        }
        self.post_form("TransactionsPost", "/api/v1/transactions", &form, csrf)
            .await
    }

    // ── network ─────────────────────────────────────────────────────

    pub async fn network_connections(
        &self,
        states: Option<&str>,
        direction: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut query = Vec::new();
        if let Some(s) = states {
            query.push(("states", s.to_string()));
        }
        if let Some(d) = direction {
            query.push(("direction", d.to_string()));
        }
        self.get("NetworkConnections", "/api/v1/network/connections", &query)
            .await
    }

    pub async fn network_connection(&self, addr: &str) -> Result<Value, ApiError> {
        self.get(
            "NetworkConnection",
            "/api/v1/network/connection",
            &[("addr", addr.to_string())],
        )
        .await
    }

    pub async fn network_connections_trust(&self) -> Result<Value, ApiError> {
        self.get(
            "NetworkConnectionsTrust",
            "/api/v1/network/connections/trust",
            &[],
        )
        .await
    }

    pub async fn network_connections_exchange(&self) -> Result<Value, ApiError> {
        self.get(
            "NetworkConnectionsExchange",
            "/api/v1/network/connections/exchange",
            &[],
        )
        .await
    }

    pub async fn default_connections(&self) -> Result<Value, ApiError> {
        self.get(
            "DefaultConnections",
            "/api/v1/network/defaultConnections",
            &[],
        )
        .await
    }

    // ── csrf ────────────────────────────────────────────────────────

    /// Fetch a fresh anti-CSRF token. Typed because the caller only
    /// ever wants the token string.
    pub async fn csrf(&self) -> Result<CsrfToken, ApiError> {
        let value = self.get("Csrf", "/api/v1/csrf", &[]).await?;
        Ok(serde_json::from_value(value)?)
    }
}

// ════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn json_response(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
    }

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri()).expect("client")
    }

    #[tokio::test]
    async fn test_version_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/version"))
            .respond_with(json_response(
                r#"{"version":"0.26.0","commit":"ff754084df0912bc0d151529e2893ca86618fb3f","branch":"v0.26.0"}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let value = client.version().await.expect("version call");
        assert_eq!(value["version"], "0.26.0");
        assert_eq!(value["branch"], "v0.26.0");
    }

    #[tokio::test]
    async fn test_block_not_found_message_is_exact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/block"))
            .and(query_param("seq", "999999999"))
            .respond_with(ResponseTemplate::new(404).set_body_string("404 Not Found\n"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.block_by_seq(999999999).await.expect_err("must fail");
        match err {
            ApiError::Protocol { code, message } => {
                assert_eq!(code, 404);
                assert_eq!(message, "Error calling Block: 404 Not Found\n");
            }
            other => panic!("expected Protocol, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_address_uxouts_empty_address_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/address_uxouts"))
            .and(query_param("address", ""))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string("400 Bad Request - address is empty\n"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.address_uxouts("").await.expect_err("must fail");
        match err {
            ApiError::Protocol { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(
                    message,
                    "Error calling AddressUxouts: 400 Bad Request - address is empty\n"
                );
            }
            other => panic!("expected Protocol, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_balance_get_and_post_hit_same_logical_endpoint() {
        let server = MockServer::start().await;
        let body = r#"{"confirmed":{"coins":100,"hours":5},"predicted":{"coins":100,"hours":5}}"#;
        Mock::given(method("GET"))
            .and(path("/api/v1/balance"))
            .and(query_param("addrs", "addr1"))
            .respond_with(json_response(body))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/balance"))
            .and(body_string_contains("addrs=addr1"))
            .respond_with(json_response(body))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let get = client.balance_get("addr1").await.expect("get");
        let post = client.balance_post("addr1", None).await.expect("post");
        assert_eq!(get, post);
    }

    #[tokio::test]
    async fn test_blocks_seqs_joins_with_commas() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .and(query_param("seqs", "0,2,5,13"))
            .respond_with(json_response(r#"{"blocks":[]}"#))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.blocks_seqs(&[0, 2, 5, 13]).await.expect("seqs call");
    }

    #[tokio::test]
    async fn test_csrf_token_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/csrf"))
            .respond_with(json_response(r#"{"csrf_token":"token-abc"}"#))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let token = client.csrf().await.expect("csrf call");
        assert_eq!(token.csrf_token, "token-abc");
    }

    #[tokio::test]
    async fn test_protected_call_sends_csrf_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/wallet/seed/verify"))
            .and(header("X-CSRF-TOKEN", "token-abc"))
            .respond_with(json_response(r#"{"data":{}}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .wallet_seed_verify("some seed words", Some("token-abc"))
            .await
            .expect("verify call");
    }

    #[tokio::test]
    async fn test_empty_csrf_token_sends_no_header() {
        let server = MockServer::start().await;
        // Mock matches only when the header is absent; an unexpected
        // header would fall through to a 404 and fail the call.
        Mock::given(method("POST"))
            .and(path("/api/v2/wallet/seed/verify"))
            .respond_with(json_response(r#"{"data":{}}"#))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .wallet_seed_verify("some seed words", Some(""))
            .await
            .expect("verify call without token");
        let requests = server.received_requests().await.expect("recorded requests");
        assert!(requests
            .iter()
            .all(|r| !r.headers.contains_key("X-CSRF-TOKEN")));
    }
}
