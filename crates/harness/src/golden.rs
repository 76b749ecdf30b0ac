//! Golden fixture store.
//!
//! A fixture encodes an implicit contract with a previously-verified
//! node build. The store exposes a single idempotent operation:
//! compare against the fixture if it exists, create it if it does not.
//! A missing fixture is first-run bootstrapping, never a failure; a
//! present-but-different fixture is always a hard mismatch. Nothing
//! here ever overwrites an existing fixture.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Golden fixture I/O failure. Fatal to the case that hit it, never
/// to the run.
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("golden storage error for '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Outcome of one compare-or-create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// No fixture existed; `actual` was persisted as the new baseline.
    Created,
    /// Fixture existed and was byte-equal to `actual`.
    Match,
    /// Fixture existed and differed.
    Mismatch { expected: String, actual: String },
}

pub struct GoldenStore {
    dir: PathBuf,
}

impl GoldenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GoldenStore { dir: dir.into() }
    }

    fn fixture_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.golden", key))
    }

    /// Compare `actual` against the fixture under `key`, creating the
    /// fixture if absent.
    ///
    /// The write happens only on the absent path; an existing fixture
    /// is read-only ground truth from then on. A storage failure is
    /// returned as-is so a broken disk can never masquerade as a
    /// match.
    pub fn compare_or_create(&self, key: &str, actual: &str) -> Result<MatchResult, GoldenError> {
        let path = self.fixture_path(key);
        if !path.exists() {
            self.create(key, &path, actual)?;
            info!(key, path = %path.display(), "golden fixture created");
            return Ok(MatchResult::Created);
        }
        let expected = fs::read_to_string(&path).map_err(|source| GoldenError::Storage {
            key: key.to_string(),
            source,
        })?;
        if expected == actual {
            debug!(key, "golden fixture matched");
            Ok(MatchResult::Match)
        } else {
            Ok(MatchResult::Mismatch {
                expected,
                actual: actual.to_string(),
            })
        }
    }

    fn create(&self, key: &str, path: &Path, actual: &str) -> Result<(), GoldenError> {
        let wrap = |source: io::Error| GoldenError::Storage {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(wrap)?;
        fs::write(path, actual).map_err(wrap)
    }
}
