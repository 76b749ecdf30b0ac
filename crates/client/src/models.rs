//! Serde models for responses the harness inspects structurally.
//!
//! Only the fields the consistency checks read are typed; everything
//! else rides along untouched (serde ignores unknown fields). Golden
//! comparison never goes through these types — it always uses the raw
//! parsed `serde_json::Value` so no field is silently dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node build information, `GET /api/v1/version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
    pub commit: String,
    pub branch: String,
}

/// Block header as returned inside every block-shaped response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub seq: u64,
    pub block_hash: String,
    pub previous_block_hash: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub tx_body_hash: String,
}

/// One transaction inside a block body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTransaction {
    #[serde(default)]
    pub txid: String,
    pub inner_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockBody {
    pub txns: Vec<BlockTransaction>,
}

/// A single block, `GET /api/v1/block`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSchema {
    pub header: BlockHeader,
    pub body: BlockBody,
    #[serde(default)]
    pub size: u64,
}

/// Block collection, `GET /api/v1/blocks` and `last_blocks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocks {
    pub blocks: Vec<BlockSchema>,
}

/// Chain head summary, `GET /api/v1/blockchain/metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainMetadata {
    pub head: BlockHeader,
    #[serde(default)]
    pub unspents: u64,
    #[serde(default)]
    pub unconfirmed: u64,
}

/// Sync progress, `GET /api/v1/blockchain/progress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub highest: u64,
    #[serde(default)]
    pub peers: Vec<PeerProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerProgress {
    pub address: String,
    pub height: u64,
}

/// Confirmed/predicted coin pair, `GET|POST /api/v1/balance`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalancePair {
    pub coins: u64,
    pub hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    pub confirmed: BalancePair,
    pub predicted: BalancePair,
}

/// `GET /api/v1/addresscount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCount {
    pub count: u64,
}

/// One confirmed transaction with status, `GET|POST /api/v1/transactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionWithStatus {
    #[serde(default)]
    pub time: u64,
    pub txn: TransactionBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionBody {
    #[serde(default)]
    pub txid: String,
    pub inner_hash: String,
}

/// Peer connection lifecycle state.
///
/// Invariant enforced by the harness: `Pending` connections always
/// report `id == 0`, and any connection with a non-zero id has left
/// the `Pending` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Pending,
    Introduced,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Pending => write!(f, "pending"),
            ConnectionState::Introduced => write!(f, "introduced"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// One peer connection record, `GET /api/v1/network/connection[s]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: u64,
    pub address: String,
    pub state: ConnectionState,
    #[serde(default)]
    pub listen_port: u16,
    #[serde(default)]
    pub mirror: u64,
    #[serde(default)]
    pub outgoing: bool,
    #[serde(default)]
    pub last_sent: i64,
    #[serde(default)]
    pub last_received: i64,
    #[serde(default)]
    pub connected_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connections {
    pub connections: Vec<Connection>,
}

/// Anti-CSRF token, `GET /api/v1/csrf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub csrf_token: String,
}
