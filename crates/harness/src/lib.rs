//! # Node API Conformance Harness
//!
//! Runs declarative test cases against a node's HTTP JSON API and
//! validates the responses in one of two modes:
//!
//! - **stable**: the node serves a frozen, reproducible chain; every
//!   successful response is compared byte-for-byte against a golden
//!   fixture (created on first run).
//! - **live**: the node serves a moving chain; responses are checked
//!   against structural invariants instead of exact content.
//!
//! On top of the per-case checks, the consistency checker validates
//! relationships between endpoints: block-by-hash vs block-by-seq,
//! range linkage, GET vs POST agreement, and so on.
//!
//! ## Modules
//! - `config`: immutable run configuration from the environment
//! - `golden`: golden fixture store with create-on-miss semantics
//! - `csrf`: anti-CSRF token session
//! - `case`: test case model and report types
//! - `consistency`: cross-endpoint invariant checks
//! - `runner`: sequential executor and mode routing
//! - `suites`: the declared case matrices, one per endpoint group

pub mod case;
pub mod config;
pub mod consistency;
pub mod csrf;
pub mod golden;
pub mod runner;
pub mod suites;

pub use case::{CaseMatrix, CaseStatus, Expectation, ReportEntry, TestCase};
pub use config::{Configuration, ExecutionMode};
pub use runner::{Report, Runner};
