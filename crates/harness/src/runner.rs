//! Sequential case executor and mode routing.
//!
//! The runner walks each matrix in declaration order, one request in
//! flight at a time. A case fails fast internally but never blocks
//! the cases after it; every error is case-scoped. Stable mode routes
//! successful responses through the golden store, live mode through
//! the case's structural check. After the matrices, the cross-endpoint
//! consistency pass runs as its own set of report entries.

use serde::Serialize;
use serde_json::Value;
use skyconf_client::{ApiClient, ApiError};
use std::fmt;
use tracing::{info, warn};

use crate::case::{CaseMatrix, CaseStatus, Expectation, ReportEntry, TestCase};
use crate::config::{Configuration, ExecutionMode};
use crate::consistency::{canonical, CheckError, ConsistencyChecker};
use crate::csrf::CsrfSession;
use crate::golden::{GoldenStore, MatchResult};

/// Chooses the assertion strategy per test. Decided once from the
/// configuration before any test runs; there is no mid-run switching.
#[derive(Debug, Clone, Copy)]
pub struct ModeRouter {
    mode: ExecutionMode,
    stable_skip_slow: bool,
}

impl ModeRouter {
    pub fn decide(config: &Configuration) -> Self {
        ModeRouter {
            mode: config.mode,
            stable_skip_slow: config.stable_skip_slow,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Slow network-dependent cases are skipped entirely in stable
    /// mode when configured — a scope reduction, not a failure path.
    pub fn should_skip(&self, case: &TestCase) -> bool {
        self.mode == ExecutionMode::Stable && self.stable_skip_slow && case.slow
    }
}

/// Aggregated run outcome.
#[derive(Debug, Serialize)]
pub struct Report {
    pub mode: ExecutionMode,
    pub entries: Vec<ReportEntry>,
    pub passed: usize,
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Report {
    fn from_entries(mode: ExecutionMode, entries: Vec<ReportEntry>) -> Self {
        let count = |status: CaseStatus| entries.iter().filter(|e| e.status == status).count();
        Report {
            mode,
            passed: count(CaseStatus::Passed),
            created: count(CaseStatus::Created),
            failed: count(CaseStatus::Failed),
            skipped: count(CaseStatus::Skipped),
            entries,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        writeln!(
            f,
            "mode={} passed={} created={} failed={} skipped={}",
            self.mode, self.passed, self.created, self.failed, self.skipped
        )
    }
}

pub struct Runner<'a> {
    client: &'a ApiClient,
    golden: &'a GoldenStore,
    csrf: &'a CsrfSession,
    config: &'a Configuration,
    router: ModeRouter,
}

impl<'a> Runner<'a> {
    pub fn new(
        client: &'a ApiClient,
        golden: &'a GoldenStore,
        csrf: &'a CsrfSession,
        config: &'a Configuration,
    ) -> Self {
        Runner {
            client,
            golden,
            csrf,
            config,
            router: ModeRouter::decide(config),
        }
    }

    /// Run every matrix plus the consistency pass, in order.
    pub async fn run_all(&self, matrices: &[CaseMatrix]) -> Report {
        let mut entries = Vec::new();
        for matrix in matrices {
            entries.extend(self.run_matrix(matrix).await);
        }
        entries.extend(self.run_consistency().await);
        self.finish(entries)
    }

    /// Run only the given matrices, without the cross-endpoint
    /// consistency pass. Used when the run is scoped to a single
    /// matrix.
    pub async fn run_matrices(&self, matrices: &[CaseMatrix]) -> Report {
        let mut entries = Vec::new();
        for matrix in matrices {
            entries.extend(self.run_matrix(matrix).await);
        }
        self.finish(entries)
    }

    fn finish(&self, entries: Vec<ReportEntry>) -> Report {
        let report = Report::from_entries(self.router.mode(), entries);
        info!(
            mode = %report.mode,
            passed = report.passed,
            created = report.created,
            failed = report.failed,
            skipped = report.skipped,
            "run complete"
        );
        report
    }

    /// Execute one matrix, strictly in declaration order.
    pub async fn run_matrix(&self, matrix: &CaseMatrix) -> Vec<ReportEntry> {
        info!(matrix = matrix.name, cases = matrix.cases.len(), "running matrix");
        let mut entries = Vec::with_capacity(matrix.cases.len());
        for case in &matrix.cases {
            let name = format!("{}/{}", matrix.name, case.name);
            let entry = self.execute_case(&name, case).await;
            if entry.status == CaseStatus::Failed {
                warn!(case = %entry.name, "case failed");
            }
            entries.push(entry);
        }
        entries
    }

    async fn execute_case(&self, name: &str, case: &TestCase) -> ReportEntry {
        if self.router.should_skip(case) {
            return ReportEntry::new(name, CaseStatus::Skipped)
                .with_detail("slow case skipped by STABLE_SKIP_SLOW");
        }
        let token = if case.call.is_protected() && self.config.use_csrf {
            Some(self.csrf.token().await)
        } else {
            None
        };
        let result = case.call.execute(self.client, token.as_deref()).await;
        match &case.expected {
            Expectation::Failure { code, message } => {
                self.judge_failure(name, *code, message, result)
            }
            Expectation::Success { golden_key } => match result {
                Err(err) => ReportEntry::new(name, CaseStatus::Failed)
                    .with_detail(format!("expected success, got error: {}", err)),
                Ok(value) => self.judge_success(name, golden_key, case, &value),
            },
        }
    }

    fn judge_failure(
        &self,
        name: &str,
        want_code: u16,
        want_message: &str,
        result: Result<Value, ApiError>,
    ) -> ReportEntry {
        match result {
            Ok(_) => ReportEntry::new(name, CaseStatus::Failed).with_detail(format!(
                "expected failure {} {:?}, call succeeded",
                want_code, want_message
            )),
            Err(ApiError::Protocol { code, message }) => {
                if code == want_code && message == want_message {
                    ReportEntry::new(name, CaseStatus::Passed)
                } else {
                    ReportEntry::new(name, CaseStatus::Failed).with_detail(format!(
                        "expected {} {:?}, got {} {:?}",
                        want_code, want_message, code, message
                    ))
                }
            }
            Err(other) => ReportEntry::new(name, CaseStatus::Failed).with_detail(format!(
                "expected protocol failure {}, got {}",
                want_code, other
            )),
        }
    }

    fn judge_success(
        &self,
        name: &str,
        golden_key: &str,
        case: &TestCase,
        value: &Value,
    ) -> ReportEntry {
        match self.router.mode() {
            ExecutionMode::Stable => {
                let actual = canonical(value);
                match self.golden.compare_or_create(golden_key, &actual) {
                    Ok(MatchResult::Created) => ReportEntry::new(name, CaseStatus::Created)
                        .with_detail(format!("golden fixture '{}' created", golden_key)),
                    Ok(MatchResult::Match) => ReportEntry::new(name, CaseStatus::Passed),
                    Ok(MatchResult::Mismatch { expected, actual }) => {
                        ReportEntry::new(name, CaseStatus::Failed).with_detail(format!(
                            "golden mismatch for '{}':\n--- expected ---\n{}\n--- actual ---\n{}",
                            golden_key, expected, actual
                        ))
                    }
                    Err(err) => ReportEntry::new(name, CaseStatus::Failed)
                        .with_detail(format!("{}", err)),
                }
            }
            ExecutionMode::Live => match case.live_check {
                None => ReportEntry::new(name, CaseStatus::Passed),
                Some(check) => match check(value, self.config) {
                    Ok(()) => ReportEntry::new(name, CaseStatus::Passed),
                    Err(reason) => {
                        ReportEntry::new(name, CaseStatus::Failed).with_detail(reason)
                    }
                },
            },
        }
    }

    /// Cross-endpoint consistency pass. Runs in both modes: the
    /// properties are structural and hold on a frozen snapshot as well
    /// as on a moving chain.
    pub async fn run_consistency(&self) -> Vec<ReportEntry> {
        // The POST legs of the equivalence checks are protected calls
        // and get the same token injection the case runner performs.
        let mut checker = ConsistencyChecker::new(self.client);
        if self.config.use_csrf {
            checker = checker.with_csrf(self.csrf);
        }
        let mut entries = Vec::new();

        entries.push(entry_from(
            "consistency/block-hash-seq-equivalence",
            checker.block_hash_seq_equivalence(1).await,
        ));
        entries.push(entry_from(
            "consistency/range-linkage",
            checker.range_linkage(1, 10).await,
        ));
        entries.push(entry_from(
            "consistency/range-inverted-empty",
            checker.range_linkage(10, 2).await,
        ));
        entries.push(entry_from(
            "consistency/seq-list-resolution",
            checker.seq_list_resolution(&[0, 2, 5, 13]).await,
        ));
        entries.push(entry_from(
            "consistency/batch-all-or-nothing",
            checker.batch_all_or_nothing(&[3, 5, 7, 99999]).await,
        ));
        entries.push(entry_from(
            "consistency/balance-get-post",
            checker
                .balance_get_post_equivalence(
                    "2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf,qxmeHkwgAMfwXyaQrwv9jq3qt228xMuoT5",
                )
                .await,
        ));
        entries.push(entry_from(
            "consistency/transactions-get-post",
            checker
                .transactions_get_post_equivalence(
                    "2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf",
                    Some(true),
                )
                .await,
        ));
        entries.push(entry_from(
            "consistency/transaction-uniqueness",
            checker
                .transaction_uniqueness("2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf")
                .await,
        ));
        entries.push(entry_from(
            "consistency/balance-duplicate-address",
            checker
                .balance_duplicate_address_idempotence("2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf")
                .await,
        ));

        // Peer-dependent checks: skippable in stable mode, and in live
        // mode the expected count flips with LIVE_DISABLE_NETWORKING.
        let skip_network = self.router.mode() == ExecutionMode::Stable
            && self.config.stable_skip_slow;
        if skip_network {
            entries.push(
                ReportEntry::new("consistency/connection-invariants", CaseStatus::Skipped)
                    .with_detail("network-dependent check skipped by STABLE_SKIP_SLOW"),
            );
        } else {
            entries.push(entry_from(
                "consistency/connection-invariants",
                checker.connection_invariants().await,
            ));
            if self.router.mode() == ExecutionMode::Live {
                entries.push(entry_from(
                    "consistency/connection-count",
                    checker
                        .connection_count(self.config.live_disable_networking)
                        .await,
                ));
            }
        }
        entries
    }
}

fn entry_from(name: &str, result: Result<(), CheckError>) -> ReportEntry {
    match result {
        Ok(()) => ReportEntry::new(name, CaseStatus::Passed),
        Err(err) => ReportEntry::new(name, CaseStatus::Failed).with_detail(format!("{}", err)),
    }
}
