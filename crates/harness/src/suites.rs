//! The declared case matrices, one per endpoint family, plus the
//! structural checks live mode substitutes for golden comparison.
//!
//! Inputs are concrete: well-known addresses with history on the
//! reference chain, the reference wallet seed, and block sequences
//! that exist on the frozen snapshot. Expected error messages are
//! verbatim node output, trailing newline included.

use serde_json::Value;

use crate::case::{ApiCall, CaseMatrix, TestCase};
use crate::config::Configuration;

/// Address with history on the reference chain.
pub const ADDR_WITH_HISTORY: &str = "2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf";
/// Second address used for multi-address queries.
pub const ADDR_SECOND: &str = "qxmeHkwgAMfwXyaQrwv9jq3qt228xMuoT5";
/// Address with no history anywhere; balance/uxout lookups for it are
/// legitimate zero-result answers, not errors.
pub const ADDR_UNKNOWN: &str = "2JJ8pgq8EDAnrzf9xxBJapE2qkYLefW4uF8";
/// Reference wallet seed for seed verification.
pub const WALLET_SEED: &str =
    "nut wife logic sample addict shop before tobacco crisp bleak lawsuit affair";

/// Every registered matrix, in execution order.
pub fn all() -> Vec<CaseMatrix> {
    vec![
        version_cases(),
        wallet_cases(),
        balance_cases(),
        address_cases(),
        block_cases(),
        blockchain_cases(),
        transaction_cases(),
        network_cases(),
        health_cases(),
    ]
}

pub fn version_cases() -> CaseMatrix {
    CaseMatrix {
        name: "version",
        cases: vec![
            TestCase::success("build-info", ApiCall::Version, "version")
                .with_live_check(live_version),
        ],
    }
}

pub fn wallet_cases() -> CaseMatrix {
    CaseMatrix {
        name: "wallet",
        cases: vec![
            TestCase::success(
                "seed-verify-valid",
                ApiCall::WalletSeedVerify {
                    seed: WALLET_SEED.to_string(),
                },
                "wallet-seed-verify",
            ),
            TestCase::failure(
                "seed-verify-invalid",
                ApiCall::WalletSeedVerify {
                    seed: "not a valid mnemonic".to_string(),
                },
                422,
                "Error calling WalletSeedVerify: 422 Unprocessable Entity - seed is not a valid bip39 seed\n",
            ),
        ],
    }
}

pub fn balance_cases() -> CaseMatrix {
    CaseMatrix {
        name: "balance",
        cases: vec![
            TestCase::failure(
                "empty-addrs",
                ApiCall::BalanceGet {
                    addrs: String::new(),
                },
                400,
                "Error calling BalanceGet: 400 Bad Request - addrs is required\n",
            ),
            TestCase::success(
                "one-address",
                ApiCall::BalanceGet {
                    addrs: ADDR_WITH_HISTORY.to_string(),
                },
                "balance-one-address",
            )
            .with_live_check(live_balance),
            TestCase::success(
                "two-addresses",
                ApiCall::BalanceGet {
                    addrs: format!("{},{}", ADDR_WITH_HISTORY, ADDR_SECOND),
                },
                "balance-two-addresses",
            )
            .with_live_check(live_balance),
            TestCase::success(
                "post-one-address",
                ApiCall::BalancePost {
                    addrs: ADDR_WITH_HISTORY.to_string(),
                },
                "balance-post-one-address",
            )
            .with_live_check(live_balance),
        ],
    }
}

pub fn address_cases() -> CaseMatrix {
    CaseMatrix {
        name: "address",
        cases: vec![
            TestCase::success("count", ApiCall::AddressCount, "address-count")
                .with_live_check(live_address_count),
            TestCase::success(
                "uxouts-known-address",
                ApiCall::AddressUxouts {
                    address: ADDR_WITH_HISTORY.to_string(),
                },
                "address-uxouts",
            )
            .mark_slow(),
            TestCase::success(
                "uxouts-unknown-address",
                ApiCall::AddressUxouts {
                    address: ADDR_UNKNOWN.to_string(),
                },
                "address-uxouts-unknown",
            )
            .with_live_check(live_empty_array)
            .mark_slow(),
            TestCase::failure(
                "uxouts-empty-address",
                ApiCall::AddressUxouts {
                    address: String::new(),
                },
                400,
                "Error calling AddressUxouts: 400 Bad Request - address is empty\n",
            ),
        ],
    }
}

pub fn block_cases() -> CaseMatrix {
    CaseMatrix {
        name: "block",
        cases: vec![
            TestCase::success("by-seq-1", ApiCall::BlockBySeq { seq: 1 }, "block-seq-1")
                .with_live_check(live_block),
            TestCase::failure(
                "by-seq-unknown",
                ApiCall::BlockBySeq { seq: 999999999 },
                404,
                "Error calling Block: 404 Not Found\n",
            ),
            TestCase::failure(
                "by-hash-unknown",
                ApiCall::BlockByHash {
                    hash: "80744ec25e6233f40074d35bf0bfdbddfac777869b954a96833cb89f44204444"
                        .to_string(),
                },
                404,
                "Error calling Block: 404 Not Found\n",
            ),
            TestCase::success(
                "range-0-3",
                ApiCall::BlocksRange { start: 0, end: 3 },
                "blocks-range-0-3",
            )
            .with_live_check(live_blocks_nonempty),
            TestCase::success(
                "range-inverted",
                ApiCall::BlocksRange { start: 10, end: 2 },
                "blocks-range-inverted",
            )
            .with_live_check(live_blocks_empty),
            TestCase::success(
                "seq-list",
                ApiCall::BlocksSeqs {
                    seqs: vec![0, 2, 5, 13],
                },
                "blocks-seqs-0-2-5-13",
            )
            .with_live_check(live_blocks_nonempty),
            TestCase::success(
                "last-one",
                ApiCall::LastBlocks { num: 1 },
                "last-blocks-1",
            )
            .with_live_check(live_last_block_single),
        ],
    }
}

pub fn blockchain_cases() -> CaseMatrix {
    CaseMatrix {
        name: "blockchain",
        cases: vec![
            TestCase::success(
                "metadata",
                ApiCall::BlockchainMetadata,
                "blockchain-metadata",
            )
            .with_live_check(live_metadata),
            TestCase::success(
                "progress",
                ApiCall::BlockchainProgress,
                "blockchain-progress",
            )
            .with_live_check(live_progress),
            TestCase::success("coin-supply", ApiCall::CoinSupply, "coin-supply")
                .with_live_check(live_coin_supply),
        ],
    }
}

pub fn transaction_cases() -> CaseMatrix {
    CaseMatrix {
        name: "transactions",
        cases: vec![
            TestCase::success(
                "get-by-address",
                ApiCall::TransactionsGet {
                    addrs: ADDR_WITH_HISTORY.to_string(),
                    confirmed: None,
                },
                "transactions-get",
            )
            .with_live_check(live_array),
            TestCase::success(
                "get-confirmed-only",
                ApiCall::TransactionsGet {
                    addrs: ADDR_WITH_HISTORY.to_string(),
                    confirmed: Some(true),
                },
                "transactions-get-confirmed",
            )
            .with_live_check(live_array),
            TestCase::success(
                "post-by-address",
                ApiCall::TransactionsPost {
                    addrs: ADDR_WITH_HISTORY.to_string(),
                    confirmed: None,
                },
                "transactions-post",
            )
            .with_live_check(live_array),
        ],
    }
}

pub fn network_cases() -> CaseMatrix {
    CaseMatrix {
        name: "network",
        cases: vec![
            TestCase::success(
                "connections",
                ApiCall::NetworkConnections {
                    states: None,
                    direction: None,
                },
                "network-connections",
            )
            .with_live_check(live_connections)
            .mark_slow(),
            TestCase::failure(
                "connection-unknown-addr",
                ApiCall::NetworkConnection {
                    addr: "127.0.0.1:4444".to_string(),
                },
                404,
                "Error calling NetworkConnection: 404 Not Found\n",
            ),
            TestCase::success(
                "connections-trust",
                ApiCall::NetworkConnectionsTrust,
                "network-connections-trust",
            )
            .mark_slow(),
            TestCase::success(
                "connections-exchange",
                ApiCall::NetworkConnectionsExchange,
                "network-connections-exchange",
            )
            .mark_slow(),
            TestCase::success(
                "default-connections",
                ApiCall::DefaultConnections,
                "default-connections",
            )
            .with_live_check(live_nonempty_array),
        ],
    }
}

pub fn health_cases() -> CaseMatrix {
    CaseMatrix {
        name: "health",
        cases: vec![
            TestCase::success("status", ApiCall::Health, "health").with_live_check(live_health),
        ],
    }
}

// ════════════════════════════════════════════════════════════════════
// LIVE-MODE STRUCTURAL CHECKS
// ════════════════════════════════════════════════════════════════════
//
// Exact content changes on a moving chain; only shape and a handful of
// monotone properties remain stable.

fn str_field<'v>(value: &'v Value, pointer: &str) -> Result<&'v str, String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing string field {}", pointer))
}

fn u64_field(value: &Value, pointer: &str) -> Result<u64, String> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("missing numeric field {}", pointer))
}

fn live_version(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    for field in ["/version", "/commit", "/branch"] {
        if str_field(value, field)?.is_empty() {
            return Err(format!("empty field {}", field));
        }
    }
    Ok(())
}

fn live_balance(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    u64_field(value, "/confirmed/coins")?;
    u64_field(value, "/confirmed/hours")?;
    u64_field(value, "/predicted/coins")?;
    u64_field(value, "/predicted/hours")?;
    Ok(())
}

fn live_address_count(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    let count = u64_field(value, "/count")?;
    if count == 0 {
        return Err("address count is 0 on a live chain".to_string());
    }
    Ok(())
}

fn live_block(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    if str_field(value, "/header/block_hash")?.is_empty() {
        return Err("block has empty hash".to_string());
    }
    u64_field(value, "/header/seq")?;
    Ok(())
}

fn blocks_len(value: &Value) -> Result<usize, String> {
    value
        .pointer("/blocks")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| "missing blocks array".to_string())
}

fn live_blocks_nonempty(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    if blocks_len(value)? == 0 {
        return Err("expected a non-empty block list".to_string());
    }
    Ok(())
}

fn live_blocks_empty(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    let len = blocks_len(value)?;
    if len != 0 {
        return Err(format!("inverted range returned {} blocks", len));
    }
    Ok(())
}

fn live_last_block_single(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    let len = blocks_len(value)?;
    if len != 1 {
        return Err(format!("last_blocks(1) returned {} blocks", len));
    }
    Ok(())
}

fn live_metadata(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    let seq = u64_field(value, "/head/seq")?;
    if seq == 0 {
        return Err("chain head is at seq 0 on a live chain".to_string());
    }
    Ok(())
}

fn live_progress(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    let current = u64_field(value, "/current")?;
    if current == 0 {
        return Err("sync progress reports current height 0".to_string());
    }
    Ok(())
}

fn live_coin_supply(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    str_field(value, "/current_supply")?;
    str_field(value, "/total_supply")?;
    str_field(value, "/max_supply")?;
    Ok(())
}

fn live_array(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    if !value.is_array() {
        return Err("expected a JSON array".to_string());
    }
    Ok(())
}

fn live_nonempty_array(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    match value.as_array() {
        Some(items) if !items.is_empty() => Ok(()),
        Some(_) => Err("expected a non-empty array".to_string()),
        None => Err("expected a JSON array".to_string()),
    }
}

fn live_empty_array(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    match value.as_array() {
        Some(items) if items.is_empty() => Ok(()),
        Some(items) => Err(format!("expected empty result, got {} entries", items.len())),
        None => Err("expected a JSON array".to_string()),
    }
}

fn live_connections(value: &Value, cfg: &Configuration) -> Result<(), String> {
    let conns = value
        .pointer("/connections")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing connections array".to_string())?;
    if cfg.live_disable_networking {
        if !conns.is_empty() {
            return Err(format!(
                "networking disabled but {} connections reported",
                conns.len()
            ));
        }
    } else if conns.is_empty() {
        return Err("live node reports no connections".to_string());
    }
    Ok(())
}

fn live_health(value: &Value, _cfg: &Configuration) -> Result<(), String> {
    if value.pointer("/version").is_none() {
        return Err("health response missing version".to_string());
    }
    if value.pointer("/blockchain").is_none() {
        return Err("health response missing blockchain summary".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Expectation;
    use std::collections::HashSet;

    #[test]
    fn test_case_names_unique_within_each_matrix() {
        for matrix in all() {
            let mut seen = HashSet::new();
            for case in &matrix.cases {
                assert!(
                    seen.insert(case.name),
                    "duplicate case name '{}' in matrix '{}'",
                    case.name,
                    matrix.name
                );
            }
        }
    }

    #[test]
    fn test_golden_keys_unique_across_all_matrices() {
        let mut seen = HashSet::new();
        for matrix in all() {
            for case in &matrix.cases {
                if let Expectation::Success { golden_key } = &case.expected {
                    assert!(seen.insert(*golden_key), "duplicate golden key '{}'", golden_key);
                }
            }
        }
    }

    #[test]
    fn test_pinned_error_messages() {
        let block = block_cases();
        let unknown_seq = block
            .cases
            .iter()
            .find(|c| c.name == "by-seq-unknown")
            .expect("case must exist");
        assert_eq!(
            unknown_seq.expected,
            Expectation::Failure {
                code: 404,
                message: "Error calling Block: 404 Not Found\n".to_string(),
            }
        );

        let address = address_cases();
        let empty_addr = address
            .cases
            .iter()
            .find(|c| c.name == "uxouts-empty-address")
            .expect("case must exist");
        assert_eq!(
            empty_addr.expected,
            Expectation::Failure {
                code: 400,
                message: "Error calling AddressUxouts: 400 Bad Request - address is empty\n"
                    .to_string(),
            }
        );
    }

    #[test]
    fn test_live_checks_accept_well_formed_payloads() {
        let cfg = Configuration::default();
        let version = serde_json::json!({
            "version": "0.26.0",
            "commit": "ff754084df0912bc0d151529e2893ca86618fb3f",
            "branch": "v0.26.0"
        });
        live_version(&version, &cfg).expect("version check");

        let balance = serde_json::json!({
            "confirmed": { "coins": 1, "hours": 2 },
            "predicted": { "coins": 1, "hours": 2 }
        });
        live_balance(&balance, &cfg).expect("balance check");

        let metadata = serde_json::json!({ "head": { "seq": 180 }, "unspents": 10 });
        live_metadata(&metadata, &cfg).expect("metadata check");
    }

    #[test]
    fn test_live_connections_flips_with_networking_flag() {
        let empty = serde_json::json!({ "connections": [] });
        let populated = serde_json::json!({ "connections": [{ "id": 1 }] });

        let networked = Configuration::default();
        assert!(live_connections(&empty, &networked).is_err());
        assert!(live_connections(&populated, &networked).is_ok());

        let isolated = Configuration {
            live_disable_networking: true,
            ..Configuration::default()
        };
        assert!(live_connections(&empty, &isolated).is_ok());
        assert!(live_connections(&populated, &isolated).is_err());
    }

    #[test]
    fn test_metadata_at_genesis_rejected_live() {
        let cfg = Configuration::default();
        let metadata = serde_json::json!({ "head": { "seq": 0 } });
        assert!(live_metadata(&metadata, &cfg).is_err());
    }
}
