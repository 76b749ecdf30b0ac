//! Cross-endpoint consistency checks.
//!
//! These validate relationships no single response can express alone:
//! the same block fetched by sequence, by hash, by range, and by
//! explicit sequence list must serialize identically; adjacent blocks
//! in a range must link through `previous_block_hash`; GET and POST
//! variants of the same logical read must agree; transaction
//! collections must not repeat an inner hash; connection records must
//! honor the id/state invariant.
//!
//! Batch sequence lookups are all-or-nothing: one unknown id fails the
//! whole request with 404. Address-keyed balance/uxout lookups for
//! unknown addresses are legitimate zero-result answers, not errors.
//! That asymmetry is the node's real contract and is preserved here.

use serde_json::Value;
use skyconf_client::models::{Blocks, BlockSchema, Connections, ConnectionState, TransactionWithStatus};
use skyconf_client::{ApiClient, ApiError};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::debug;

use crate::csrf::CsrfSession;

/// A cross-endpoint invariant failed. Carries both observed sides.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("consistency violation [{check}]: expected {expected}, got {actual}")]
pub struct Violation {
    pub check: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Failure of a consistency check: either the invariant itself, or an
/// API error hit while gathering the evidence.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Violation(#[from] Violation),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Canonical serialized form used for byte-exact comparison between
/// endpoints and against golden fixtures.
pub fn canonical(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub struct ConsistencyChecker<'a> {
    client: &'a ApiClient,
    csrf: Option<&'a CsrfSession>,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        ConsistencyChecker { client, csrf: None }
    }

    /// Attach a CSRF session. The POST legs of the GET/POST
    /// equivalence checks are protected calls, so against a node that
    /// enforces CSRF they need the same token injection the case
    /// runner performs.
    pub fn with_csrf(mut self, session: &'a CsrfSession) -> Self {
        self.csrf = Some(session);
        self
    }

    async fn csrf_token(&self) -> Option<String> {
        match self.csrf {
            Some(session) => Some(session.token().await),
            None => None,
        }
    }

    /// A block fetched by sequence and re-fetched by its reported hash
    /// must serialize byte-identically.
    pub async fn block_hash_seq_equivalence(&self, seq: u64) -> Result<(), CheckError> {
        let by_seq = self.client.block_by_seq(seq).await?;
        let block: BlockSchema =
            serde_json::from_value(by_seq.clone()).map_err(ApiError::from)?;
        let by_hash = self.client.block_by_hash(&block.header.block_hash).await?;
        if canonical(&by_seq) != canonical(&by_hash) {
            return Err(Violation {
                check: "block-hash-seq-equivalence",
                expected: canonical(&by_seq),
                actual: canonical(&by_hash),
            }
            .into());
        }
        debug!(seq, hash = %block.header.block_hash, "hash/seq fetch paths agree");
        Ok(())
    }

    /// A contiguous range `[start, end]` must return exactly
    /// `end - start + 1` blocks, sequenced `start + i`, each linking
    /// to its predecessor through `previous_block_hash`. An inverted
    /// range yields an empty result, never an error.
    pub async fn range_linkage(&self, start: u64, end: u64) -> Result<(), CheckError> {
        let value = self.client.blocks_range(start, end).await?;
        let blocks: Blocks = serde_json::from_value(value).map_err(ApiError::from)?;
        if start > end {
            if !blocks.blocks.is_empty() {
                return Err(Violation {
                    check: "range-inverted-empty",
                    expected: "0 blocks".to_string(),
                    actual: format!("{} blocks", blocks.blocks.len()),
                }
                .into());
            }
            return Ok(());
        }
        let want = (end - start + 1) as usize;
        if blocks.blocks.len() != want {
            return Err(Violation {
                check: "range-size",
                expected: format!("{} blocks", want),
                actual: format!("{} blocks", blocks.blocks.len()),
            }
            .into());
        }
        for (i, block) in blocks.blocks.iter().enumerate() {
            let want_seq = start + i as u64;
            if block.header.seq != want_seq {
                return Err(Violation {
                    check: "range-sequence",
                    expected: format!("seq {}", want_seq),
                    actual: format!("seq {}", block.header.seq),
                }
                .into());
            }
        }
        for pair in blocks.blocks.windows(2) {
            if pair[0].header.block_hash != pair[1].header.previous_block_hash {
                return Err(Violation {
                    check: "range-linkage",
                    expected: pair[0].header.block_hash.clone(),
                    actual: pair[1].header.previous_block_hash.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// An explicit sequence-list query resolves each distinct id to
    /// exactly one block with that sequence, and re-fetching every
    /// returned block by its hash agrees with the list entry.
    pub async fn seq_list_resolution(&self, seqs: &[u64]) -> Result<(), CheckError> {
        let distinct: BTreeSet<u64> = seqs.iter().copied().collect();
        let value = self.client.blocks_seqs(seqs).await?;
        let blocks: Blocks = serde_json::from_value(value.clone()).map_err(ApiError::from)?;
        if blocks.blocks.len() != distinct.len() {
            return Err(Violation {
                check: "seq-list-size",
                expected: format!("{} blocks", distinct.len()),
                actual: format!("{} blocks", blocks.blocks.len()),
            }
            .into());
        }
        let returned: BTreeSet<u64> = blocks.blocks.iter().map(|b| b.header.seq).collect();
        if returned != distinct {
            return Err(Violation {
                check: "seq-list-resolution",
                expected: format!("{:?}", distinct),
                actual: format!("{:?}", returned),
            }
            .into());
        }
        let entries = value
            .get("blocks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for (entry, block) in entries.iter().zip(blocks.blocks.iter()) {
            let by_hash = self.client.block_by_hash(&block.header.block_hash).await?;
            if canonical(entry) != canonical(&by_hash) {
                return Err(Violation {
                    check: "seq-list-hash-agreement",
                    expected: canonical(entry),
                    actual: canonical(&by_hash),
                }
                .into());
            }
        }
        Ok(())
    }

    /// A sequence list containing any unknown id must fail the whole
    /// batch with 404, even when every other id is valid.
    pub async fn batch_all_or_nothing(&self, seqs: &[u64]) -> Result<(), CheckError> {
        match self.client.blocks_seqs(seqs).await {
            Err(ApiError::Protocol { code: 404, .. }) => Ok(()),
            Err(other) => Err(other.into()),
            Ok(_) => Err(Violation {
                check: "batch-all-or-nothing",
                expected: "404 for the whole batch".to_string(),
                actual: "success".to_string(),
            }
            .into()),
        }
    }

    /// GET and POST balance for the same address set must serialize
    /// identically.
    pub async fn balance_get_post_equivalence(&self, addrs: &str) -> Result<(), CheckError> {
        let get = self.client.balance_get(addrs).await?;
        let token = self.csrf_token().await;
        let post = self.client.balance_post(addrs, token.as_deref()).await?;
        if canonical(&get) != canonical(&post) {
            return Err(Violation {
                check: "balance-get-post-equivalence",
                expected: canonical(&get),
                actual: canonical(&post),
            }
            .into());
        }
        Ok(())
    }

    /// GET and POST transactions for the same logical query must
    /// serialize identically.
    pub async fn transactions_get_post_equivalence(
        &self,
        addrs: &str,
        confirmed: Option<bool>,
    ) -> Result<(), CheckError> {
        let get = self.client.transactions_get(addrs, confirmed).await?;
        let token = self.csrf_token().await;
        let post = self
            .client
            .transactions_post(addrs, confirmed, token.as_deref())
            .await?;
        if canonical(&get) != canonical(&post) {
            return Err(Violation {
                check: "transactions-get-post-equivalence",
                expected: canonical(&get),
                actual: canonical(&post),
            }
            .into());
        }
        Ok(())
    }

    /// No two entries in a returned transaction collection may share
    /// an inner hash.
    pub async fn transaction_uniqueness(&self, addrs: &str) -> Result<(), CheckError> {
        let value = self.client.transactions_get(addrs, None).await?;
        let txns: Vec<TransactionWithStatus> =
            serde_json::from_value(value).map_err(ApiError::from)?;
        let mut seen = HashSet::new();
        for tx in &txns {
            if !seen.insert(tx.txn.inner_hash.clone()) {
                return Err(Violation {
                    check: "transaction-uniqueness",
                    expected: "distinct inner hashes".to_string(),
                    actual: format!("duplicate inner hash {}", tx.txn.inner_hash),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Requesting a balance with an address duplicated in the same
    /// comma-joined request must answer identically to the
    /// single-address request.
    pub async fn balance_duplicate_address_idempotence(
        &self,
        addr: &str,
    ) -> Result<(), CheckError> {
        let single = self.client.balance_get(addr).await?;
        let doubled = self
            .client
            .balance_get(&format!("{},{}", addr, addr))
            .await?;
        if canonical(&single) != canonical(&doubled) {
            return Err(Violation {
                check: "balance-duplicate-address",
                expected: canonical(&single),
                actual: canonical(&doubled),
            }
            .into());
        }
        Ok(())
    }

    /// Every reported connection honors: `state == pending ⇒ id == 0`
    /// and `id != 0 ⇒ state != pending`.
    pub async fn connection_invariants(&self) -> Result<(), CheckError> {
        let value = self.client.network_connections(None, None).await?;
        let conns: Connections = serde_json::from_value(value).map_err(ApiError::from)?;
        for conn in &conns.connections {
            // id != 0 ⇒ state != pending is the contrapositive of the
            // same invariant, so one check covers both directions.
            if conn.state == ConnectionState::Pending && conn.id != 0 {
                return Err(Violation {
                    check: "connection-pending-id",
                    expected: format!("id 0 for pending connection {}", conn.address),
                    actual: format!("id {}", conn.id),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Peer-count expectation: non-zero on a networked live node,
    /// exactly zero when networking is disabled.
    pub async fn connection_count(&self, expect_zero: bool) -> Result<(), CheckError> {
        let value = self.client.network_connections(None, None).await?;
        let conns: Connections = serde_json::from_value(value).map_err(ApiError::from)?;
        let count = conns.connections.len();
        if expect_zero && count != 0 {
            return Err(Violation {
                check: "connection-count",
                expected: "0 connections (networking disabled)".to_string(),
                actual: format!("{} connections", count),
            }
            .into());
        }
        if !expect_zero && count == 0 {
            return Err(Violation {
                check: "connection-count",
                expected: "at least 1 connection".to_string(),
                actual: "0 connections".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn block_json(seq: u64, hash: &str, previous: &str) -> serde_json::Value {
        serde_json::json!({
            "header": {
                "seq": seq,
                "block_hash": hash,
                "previous_block_hash": previous,
                "timestamp": 1_500_000_000 + seq,
                "fee": 0,
                "version": 0,
                "tx_body_hash": format!("body-{}", seq)
            },
            "body": { "txns": [] },
            "size": 200
        })
    }

    fn json_response(value: &serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(value.to_string(), "application/json")
    }

    async fn mock_block_by_seq(server: &MockServer, seq: u64, body: &serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/block"))
            .and(query_param("seq", seq.to_string()))
            .respond_with(json_response(body))
            .mount(server)
            .await;
    }

    async fn mock_block_by_hash(server: &MockServer, hash: &str, body: &serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/block"))
            .and(query_param("hash", hash))
            .respond_with(json_response(body))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri()).expect("client")
    }

    #[tokio::test]
    async fn test_hash_seq_equivalence_passes_when_identical() {
        let server = MockServer::start().await;
        let block = block_json(4, "hash-4", "hash-3");
        mock_block_by_seq(&server, 4, &block).await;
        mock_block_by_hash(&server, "hash-4", &block).await;

        let client = client_for(&server);
        ConsistencyChecker::new(&client)
            .block_hash_seq_equivalence(4)
            .await
            .expect("paths must agree");
    }

    #[tokio::test]
    async fn test_hash_seq_equivalence_detects_divergence() {
        let server = MockServer::start().await;
        let by_seq = block_json(4, "hash-4", "hash-3");
        let mut by_hash = by_seq.clone();
        by_hash["size"] = serde_json::json!(999);
        mock_block_by_seq(&server, 4, &by_seq).await;
        mock_block_by_hash(&server, "hash-4", &by_hash).await;

        let client = client_for(&server);
        let err = ConsistencyChecker::new(&client)
            .block_hash_seq_equivalence(4)
            .await
            .expect_err("must detect divergence");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "block-hash-seq-equivalence"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_range_linkage_passes_on_well_linked_chain() {
        let server = MockServer::start().await;
        let blocks = serde_json::json!({
            "blocks": [
                block_json(2, "hash-2", "hash-1"),
                block_json(3, "hash-3", "hash-2"),
                block_json(4, "hash-4", "hash-3"),
            ]
        });
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .and(query_param("start", "2"))
            .and(query_param("end", "4"))
            .respond_with(json_response(&blocks))
            .mount(&server)
            .await;

        let client = client_for(&server);
        ConsistencyChecker::new(&client)
            .range_linkage(2, 4)
            .await
            .expect("linked range must pass");
    }

    #[tokio::test]
    async fn test_range_linkage_detects_broken_link() {
        let server = MockServer::start().await;
        let blocks = serde_json::json!({
            "blocks": [
                block_json(2, "hash-2", "hash-1"),
                block_json(3, "hash-3", "not-hash-2"),
            ]
        });
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .respond_with(json_response(&blocks))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ConsistencyChecker::new(&client)
            .range_linkage(2, 3)
            .await
            .expect_err("must detect broken link");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "range-linkage"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_range_size_mismatch_detected() {
        let server = MockServer::start().await;
        let blocks = serde_json::json!({ "blocks": [block_json(2, "hash-2", "hash-1")] });
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .respond_with(json_response(&blocks))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ConsistencyChecker::new(&client)
            .range_linkage(2, 4)
            .await
            .expect_err("must detect short range");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "range-size"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inverted_range_expects_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .respond_with(json_response(&serde_json::json!({ "blocks": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        ConsistencyChecker::new(&client)
            .range_linkage(10, 2)
            .await
            .expect("inverted range with empty result must pass");
    }

    #[tokio::test]
    async fn test_seq_list_resolution_with_hash_agreement() {
        let server = MockServer::start().await;
        let b0 = block_json(0, "hash-0", "");
        let b2 = block_json(2, "hash-2", "hash-1");
        let blocks = serde_json::json!({ "blocks": [b0.clone(), b2.clone()] });
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .and(query_param("seqs", "0,2"))
            .respond_with(json_response(&blocks))
            .mount(&server)
            .await;
        mock_block_by_hash(&server, "hash-0", &b0).await;
        mock_block_by_hash(&server, "hash-2", &b2).await;

        let client = client_for(&server);
        ConsistencyChecker::new(&client)
            .seq_list_resolution(&[0, 2])
            .await
            .expect("list resolution must pass");
    }

    #[tokio::test]
    async fn test_batch_all_or_nothing_requires_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .and(query_param("seqs", "3,5,7,99999"))
            .respond_with(ResponseTemplate::new(404).set_body_string("404 Not Found\n"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        ConsistencyChecker::new(&client)
            .batch_all_or_nothing(&[3, 5, 7, 99999])
            .await
            .expect("batch 404 is the required outcome");
    }

    #[tokio::test]
    async fn test_batch_partial_success_is_a_violation() {
        let server = MockServer::start().await;
        let blocks = serde_json::json!({ "blocks": [block_json(3, "hash-3", "hash-2")] });
        Mock::given(method("GET"))
            .and(path("/api/v1/blocks"))
            .respond_with(json_response(&blocks))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ConsistencyChecker::new(&client)
            .batch_all_or_nothing(&[3, 99999])
            .await
            .expect_err("partial resolution must be rejected");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "batch-all-or-nothing"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transaction_uniqueness_detects_duplicates() {
        let server = MockServer::start().await;
        let txns = serde_json::json!([
            { "time": 1, "txn": { "txid": "t1", "inner_hash": "inner-a" } },
            { "time": 2, "txn": { "txid": "t2", "inner_hash": "inner-a" } }
        ]);
        Mock::given(method("GET"))
            .and(path("/api/v1/transactions"))
            .respond_with(json_response(&txns))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ConsistencyChecker::new(&client)
            .transaction_uniqueness("addr1")
            .await
            .expect_err("must detect duplicate inner hash");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "transaction-uniqueness"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_post_equivalence_attaches_csrf_token() {
        let server = MockServer::start().await;
        let balance = serde_json::json!({
            "confirmed": { "coins": 42, "hours": 7 },
            "predicted": { "coins": 42, "hours": 7 }
        });
        Mock::given(method("GET"))
            .and(path("/api/v1/csrf"))
            .respond_with(json_response(&serde_json::json!({ "csrf_token": "tok-99" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/balance"))
            .respond_with(json_response(&balance))
            .mount(&server)
            .await;
        // Tokened POST is mounted first; the catch-all below rejects
        // any un-tokened POST the way a CSRF-enforcing node does.
        Mock::given(method("POST"))
            .and(path("/api/v1/balance"))
            .and(header("X-CSRF-TOKEN", "tok-99"))
            .respond_with(json_response(&balance))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/balance"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string("403 Forbidden - invalid CSRF token\n"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let session = CsrfSession::new(client.clone());
        ConsistencyChecker::new(&client)
            .with_csrf(&session)
            .balance_get_post_equivalence("2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf")
            .await
            .expect("tokened POST leg must succeed");

        // Without a session the POST leg is rejected by the node.
        let err = ConsistencyChecker::new(&client)
            .balance_get_post_equivalence("2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf")
            .await
            .expect_err("un-tokened POST must surface the node rejection");
        match err {
            CheckError::Api(ApiError::Protocol { code, message }) => {
                assert_eq!(code, 403);
                assert_eq!(
                    message,
                    "Error calling BalancePost: 403 Forbidden - invalid CSRF token\n"
                );
            }
            other => panic!("expected Protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_balance_duplicate_address_idempotence() {
        let server = MockServer::start().await;
        let balance = serde_json::json!({
            "confirmed": { "coins": 42, "hours": 7 },
            "predicted": { "coins": 42, "hours": 7 }
        });
        Mock::given(method("GET"))
            .and(path("/api/v1/balance"))
            .respond_with(json_response(&balance))
            .mount(&server)
            .await;

        let client = client_for(&server);
        ConsistencyChecker::new(&client)
            .balance_duplicate_address_idempotence("2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf")
            .await
            .expect("duplicated address must be idempotent");
    }

    #[tokio::test]
    async fn test_connection_invariant_rejects_pending_with_id() {
        let server = MockServer::start().await;
        let conns = serde_json::json!({
            "connections": [{
                "id": 17,
                "address": "10.0.0.1:6000",
                "state": "pending",
                "listen_port": 6000,
                "mirror": 0,
                "outgoing": true,
                "last_sent": 0,
                "last_received": 0,
                "connected_at": 0
            }]
        });
        Mock::given(method("GET"))
            .and(path("/api/v1/network/connections"))
            .respond_with(json_response(&conns))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ConsistencyChecker::new(&client)
            .connection_invariants()
            .await
            .expect_err("pending connection with non-zero id must fail");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "connection-pending-id"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_count_zero_when_networking_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/network/connections"))
            .respond_with(json_response(&serde_json::json!({ "connections": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let checker = ConsistencyChecker::new(&client);
        checker
            .connection_count(true)
            .await
            .expect("zero connections expected with networking disabled");
        let err = checker
            .connection_count(false)
            .await
            .expect_err("zero connections must fail a networked expectation");
        match err {
            CheckError::Violation(v) => assert_eq!(v.check, "connection-count"),
            other => panic!("expected Violation, got {:?}", other),
        }
    }
}
