//! Test case model and report types.
//!
//! Cases are declared as plain data: an [`ApiCall`] naming the
//! operation and its inputs, plus an [`Expectation`] describing the
//! outcome class. Matrices are built once at registration time and
//! read-only afterwards; ordering within a matrix is for readability
//! only, cases are independent.

use serde::Serialize;
use serde_json::Value;
use skyconf_client::{ApiClient, ApiError};
use std::fmt;

use crate::config::Configuration;

/// Structural assertion applied to a successful response in live
/// mode, where golden comparison is impossible. `Err` carries a
/// human-readable description of the violated property.
pub type LiveCheck = fn(&Value, &Configuration) -> Result<(), String>;

/// One API operation with its inputs. A pure data description; the
/// runner turns it into a client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Version,
    WalletSeedVerify { seed: String },
    BalanceGet { addrs: String },
    BalancePost { addrs: String },
    AddressCount,
    AddressUxouts { address: String },
    BlockByHash { hash: String },
    BlockBySeq { seq: u64 },
    BlocksRange { start: u64, end: u64 },
    BlocksSeqs { seqs: Vec<u64> },
    BlockchainMetadata,
    BlockchainProgress,
    CoinSupply,
    TransactionsGet { addrs: String, confirmed: Option<bool> },
    TransactionsPost { addrs: String, confirmed: Option<bool> },
    Health,
    LastBlocks { num: u64 },
    NetworkConnections { states: Option<String>, direction: Option<String> },
    NetworkConnection { addr: String },
    NetworkConnectionsTrust,
    NetworkConnectionsExchange,
    DefaultConnections,
}

impl ApiCall {
    /// The node-facing operation name, as it appears in protocol error
    /// messages.
    pub fn operation(&self) -> &'static str {
        match self {
            ApiCall::Version => "Version",
            ApiCall::WalletSeedVerify { .. } => "WalletSeedVerify",
            ApiCall::BalanceGet { .. } => "BalanceGet",
            ApiCall::BalancePost { .. } => "BalancePost",
            ApiCall::AddressCount => "AddressCount",
            ApiCall::AddressUxouts { .. } => "AddressUxouts",
            ApiCall::BlockByHash { .. } | ApiCall::BlockBySeq { .. } => "Block",
            ApiCall::BlocksRange { .. } | ApiCall::BlocksSeqs { .. } => "Blocks",
            ApiCall::BlockchainMetadata => "BlockchainMetadata",
            ApiCall::BlockchainProgress => "BlockchainProgress",
            ApiCall::CoinSupply => "CoinSupply",
            ApiCall::TransactionsGet { .. } => "TransactionsGet",
            ApiCall::TransactionsPost { .. } => "TransactionsPost",
            ApiCall::Health => "Health",
            ApiCall::LastBlocks { .. } => "LastBlocks",
            ApiCall::NetworkConnections { .. } => "NetworkConnections",
            ApiCall::NetworkConnection { .. } => "NetworkConnection",
            ApiCall::NetworkConnectionsTrust => "NetworkConnectionsTrust",
            ApiCall::NetworkConnectionsExchange => "NetworkConnectionsExchange",
            ApiCall::DefaultConnections => "DefaultConnections",
        }
    }

    /// Whether the node treats this call as CSRF-protected. All
    /// state-mutating or body-carrying methods are.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            ApiCall::WalletSeedVerify { .. }
                | ApiCall::BalancePost { .. }
                | ApiCall::TransactionsPost { .. }
        )
    }

    /// Issue the call. `csrf` is attached only on protected calls and
    /// only when non-empty.
    pub async fn execute(&self, client: &ApiClient, csrf: Option<&str>) -> Result<Value, ApiError> {
        match self {
            ApiCall::Version => client.version().await,
            ApiCall::WalletSeedVerify { seed } => client.wallet_seed_verify(seed, csrf).await,
            ApiCall::BalanceGet { addrs } => client.balance_get(addrs).await,
            ApiCall::BalancePost { addrs } => client.balance_post(addrs, csrf).await,
            ApiCall::AddressCount => client.address_count().await,
            ApiCall::AddressUxouts { address } => client.address_uxouts(address).await,
            ApiCall::BlockByHash { hash } => client.block_by_hash(hash).await,
            ApiCall::BlockBySeq { seq } => client.block_by_seq(*seq).await,
            ApiCall::BlocksRange { start, end } => client.blocks_range(*start, *end).await,
            ApiCall::BlocksSeqs { seqs } => client.blocks_seqs(seqs).await,
            ApiCall::BlockchainMetadata => client.blockchain_metadata().await,
            ApiCall::BlockchainProgress => client.blockchain_progress().await,
            ApiCall::CoinSupply => client.coin_supply().await,
            ApiCall::TransactionsGet { addrs, confirmed } => {
                client.transactions_get(addrs, *confirmed).await
            }
            ApiCall::TransactionsPost { addrs, confirmed } => {
                client.transactions_post(addrs, *confirmed, csrf).await
            }
            ApiCall::Health => client.health().await,
            ApiCall::LastBlocks { num } => client.last_blocks(*num).await,
            ApiCall::NetworkConnections { states, direction } => {
                client
                    .network_connections(states.as_deref(), direction.as_deref())
                    .await
            }
            ApiCall::NetworkConnection { addr } => client.network_connection(addr).await,
            ApiCall::NetworkConnectionsTrust => client.network_connections_trust().await,
            ApiCall::NetworkConnectionsExchange => client.network_connections_exchange().await,
            ApiCall::DefaultConnections => client.default_connections().await,
        }
    }
}

/// Expected outcome class for a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Call succeeds; in stable mode the serialized response is held
    /// against the golden fixture under `golden_key`.
    Success { golden_key: &'static str },
    /// Call is rejected with exactly this code and message. Messages
    /// are compared verbatim, trailing newline included.
    Failure { code: u16, message: String },
}

/// One declared test case. Immutable once declared.
pub struct TestCase {
    pub name: &'static str,
    pub call: ApiCall,
    pub expected: Expectation,
    /// Extra structural assertion for live mode. Absent = a parsed
    /// 2xx response is enough.
    pub live_check: Option<LiveCheck>,
    /// Slow network-dependent case, skippable in stable mode.
    pub slow: bool,
}

impl TestCase {
    pub fn success(name: &'static str, call: ApiCall, golden_key: &'static str) -> Self {
        TestCase {
            name,
            call,
            expected: Expectation::Success { golden_key },
            live_check: None,
            slow: false,
        }
    }

    pub fn failure(name: &'static str, call: ApiCall, code: u16, message: impl Into<String>) -> Self {
        TestCase {
            name,
            call,
            expected: Expectation::Failure {
                code,
                message: message.into(),
            },
            live_check: None,
            slow: false,
        }
    }

    pub fn with_live_check(mut self, check: LiveCheck) -> Self {
        self.live_check = Some(check);
        self
    }

    pub fn mark_slow(mut self) -> Self {
        self.slow = true;
        self
    }
}

/// A named group of cases for one logical operation family.
pub struct CaseMatrix {
    pub name: &'static str,
    pub cases: Vec<TestCase>,
}

/// Per-case verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    /// Golden fixture did not exist and was seeded. Informational.
    Created,
    Failed,
    /// Excluded by configuration, not executed.
    Skipped,
}

impl CaseStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "PASS",
            CaseStatus::Created => "SEED",
            CaseStatus::Failed => "FAIL",
            CaseStatus::Skipped => "SKIP",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Reported outcome for one case.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub status: CaseStatus,
    /// On failure: expected vs actual content, or expected vs actual
    /// error code/message.
    pub detail: Option<String>,
}

impl ReportEntry {
    pub fn new(name: impl Into<String>, status: CaseStatus) -> Self {
        ReportEntry {
            name: name.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.name)?;
        if let Some(ref detail) = self.detail {
            write!(f, "\n{}", detail)?;
        }
        Ok(())
    }
}
