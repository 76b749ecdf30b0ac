//! Run configuration.
//!
//! One immutable `Configuration` is built from the environment at
//! startup and threaded explicitly into the runner; nothing reads the
//! environment mid-test. Unrecognized `TESTMODE` values are a startup
//! error rather than a silent default.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

/// Which assertion strategy each test uses. Decided once per process,
/// never switched mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Frozen chain snapshot, golden-file comparison.
    Stable,
    /// Moving chain, structural invariants only.
    Live,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Stable => write!(f, "stable"),
            ExecutionMode::Live => write!(f, "live"),
        }
    }
}

/// Immutable harness configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    pub mode: ExecutionMode,
    /// Informational coin name, reported but never branched on.
    pub coin: String,
    /// Whether protected calls fetch and attach a CSRF token.
    pub use_csrf: bool,
    /// Base URL of the node under test.
    pub node_host: String,
    /// In live mode: peer-dependent checks expect zero connections.
    pub live_disable_networking: bool,
    /// In stable mode: skip slow network-dependent cases entirely.
    pub stable_skip_slow: bool,
    /// Directory holding golden fixture files.
    pub golden_dir: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            mode: ExecutionMode::Stable,
            coin: "skycoin".to_string(),
            use_csrf: false,
            node_host: "http://localhost:6420".to_string(),
            live_disable_networking: false,
            stable_skip_slow: false,
            golden_dir: "golden".to_string(),
        }
    }
}

impl Configuration {
    /// Build from process environment variables.
    ///
    /// Recognized keys: `TESTMODE`, `COIN`, `USE_CSRF`, `NODE_HOST`,
    /// `LIVE_DISABLE_NETWORKING`, `STABLE_SKIP_SLOW`, `GOLDEN_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` delegates here;
    /// tests inject their own lookup instead of mutating the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Configuration::default();
        let mode = match lookup("TESTMODE") {
            None => defaults.mode,
            Some(raw) => parse_mode(&raw)?,
        };
        Ok(Configuration {
            mode,
            coin: lookup("COIN").unwrap_or(defaults.coin),
            use_csrf: parse_bool_opt(lookup("USE_CSRF"), "USE_CSRF")?,
            node_host: lookup("NODE_HOST").unwrap_or(defaults.node_host),
            live_disable_networking: parse_bool_opt(
                lookup("LIVE_DISABLE_NETWORKING"),
                "LIVE_DISABLE_NETWORKING",
            )?,
            stable_skip_slow: parse_bool_opt(lookup("STABLE_SKIP_SLOW"), "STABLE_SKIP_SLOW")?,
            golden_dir: lookup("GOLDEN_DIR").unwrap_or(defaults.golden_dir),
        })
    }
}

fn parse_mode(raw: &str) -> Result<ExecutionMode> {
    match raw.to_lowercase().as_str() {
        "stable" => Ok(ExecutionMode::Stable),
        "live" => Ok(ExecutionMode::Live),
        other => bail!("invalid TESTMODE '{}': must be 'stable' or 'live'", other),
    }
}

fn parse_bool_opt(raw: Option<String>, key: &str) -> Result<bool> {
    match raw {
        None => Ok(false),
        Some(v) => match v.to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => bail!("invalid {} '{}': must be true or false", key, other),
        },
    }
}
