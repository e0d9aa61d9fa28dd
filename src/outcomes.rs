//! Outcome index: failing and passing tests of one run
//!
//! Built from the terminal test report. Two report shapes are accepted:
//!
//! - the minimal form `{"failed": [...], "passed": [...]}`
//! - pytest-json-report output `{"tests": [{"nodeid": ..., "outcome": ...}]}`
//!
//! Each outcome starts with no executed lines; the aggregator fills them in
//! by correlating coverage contexts against [`OutcomeIndex::owner_mut`].

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a test report
#[derive(Error, Debug)]
pub enum OutcomeError {
    #[error("Test report not found: {0}")]
    FileNotFound(String),

    #[error("Invalid test report JSON: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Test report lists neither failed nor passed tests")]
    NoOutcomeLists,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for outcome loading
pub type Result<T> = std::result::Result<T, OutcomeError>;

/// Pass/fail verdict of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

/// One test result together with the lines it executed
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub test_id: String,
    pub verdict: Verdict,
    /// Absolute line numbers, first-seen order, no repeats
    pub executed_lines: Vec<u32>,
    /// Measured files this test touched, first-seen order
    pub touched_files: Vec<String>,
    seen_lines: HashSet<u32>,
    seen_files: HashSet<String>,
}

impl TestOutcome {
    pub fn new(test_id: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            test_id: test_id.into(),
            verdict,
            executed_lines: Vec::new(),
            touched_files: Vec::new(),
            seen_lines: HashSet::new(),
            seen_files: HashSet::new(),
        }
    }

    /// Record that this test executed `line` of `file`
    pub fn record_hit(&mut self, line: u32, file: &str) {
        if self.seen_lines.insert(line) {
            self.executed_lines.push(line);
        }
        if !self.seen_files.contains(file) {
            self.seen_files.insert(file.to_string());
            self.touched_files.push(file.to_string());
        }
    }

    /// Production file key this test is presumed to exercise
    pub fn file_key(&self) -> &str {
        derive_file_key(&self.test_id)
    }

    /// First measured file this test touched
    pub fn attribution_path(&self) -> Option<&str> {
        self.touched_files.first().map(String::as_str)
    }
}

/// Map a test identifier to the production module it exercises
///
/// `tests/test_calc.py::TestAdd::test_zero` becomes `calc.py`: the function
/// suffix is cut at the first `::`, then everything up to the last `test_`
/// is dropped. Identifiers without a usable path component map to
/// themselves.
pub fn derive_file_key(test_id: &str) -> &str {
    let path = test_id.split("::").next().unwrap_or_default();
    if path.is_empty() {
        return test_id;
    }

    let key = path.rsplit("test_").next().unwrap_or(path);
    if key.is_empty() {
        test_id
    } else {
        key
    }
}

/// A single entry of a pytest-json-report file
#[derive(Debug, Clone, Deserialize)]
pub struct PytestTest {
    pub nodeid: String,
    pub outcome: String,
}

/// Minimal `{"failed": [...], "passed": [...]}` report
///
/// Either list may be omitted, but not both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutcomeLists {
    #[serde(default)]
    pub failed: Option<Vec<String>>,
    #[serde(default)]
    pub passed: Option<Vec<String>>,
}

/// Test report as read from disk
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestReport {
    PytestJson { tests: Vec<PytestTest> },
    Lists(OutcomeLists),
}

/// Failing and passing outcomes with an exact owner lookup
#[derive(Debug, Clone, Default)]
pub struct OutcomeIndex {
    failed: Vec<TestOutcome>,
    passed: Vec<TestOutcome>,
    owners: HashMap<String, (Verdict, usize)>,
}

impl OutcomeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit identifier lists
    pub fn from_ids<F, P, S, T>(failed: F, passed: P) -> Self
    where
        F: IntoIterator<Item = S>,
        P: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut index = Self::new();
        for id in failed {
            index.push(id, Verdict::Fail);
        }
        for id in passed {
            index.push(id, Verdict::Pass);
        }
        index
    }

    /// Build from a parsed report
    pub fn from_report(report: TestReport) -> Result<Self> {
        match report {
            TestReport::Lists(OutcomeLists {
                failed: None,
                passed: None,
            }) => Err(OutcomeError::NoOutcomeLists),
            TestReport::Lists(OutcomeLists { failed, passed }) => Ok(Self::from_ids(
                failed.unwrap_or_default(),
                passed.unwrap_or_default(),
            )),
            TestReport::PytestJson { tests } => {
                let mut index = Self::new();
                for test in tests {
                    match test.outcome.as_str() {
                        "failed" | "error" => {
                            index.push(test.nodeid, Verdict::Fail);
                        }
                        "passed" => {
                            index.push(test.nodeid, Verdict::Pass);
                        }
                        other => {
                            tracing::debug!("Ignoring {} test {}", other, test.nodeid);
                        }
                    }
                }
                Ok(index)
            }
        }
    }

    /// Load a test report file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OutcomeError::FileNotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(path)?;
        let index = Self::from_json_str(&contents)?;
        tracing::info!(
            "Loaded {} failing and {} passing tests from {}",
            index.failed.len(),
            index.passed.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let report: TestReport = serde_json::from_str(contents)?;
        Self::from_report(report)
    }

    /// Add a test; returns false if the identifier was already present
    pub fn push(&mut self, test_id: impl Into<String>, verdict: Verdict) -> bool {
        let test_id = test_id.into();
        if self.owners.contains_key(&test_id) {
            tracing::warn!("Duplicate test id {} ignored", test_id);
            return false;
        }

        let list = match verdict {
            Verdict::Fail => &mut self.failed,
            Verdict::Pass => &mut self.passed,
        };
        self.owners.insert(test_id.clone(), (verdict, list.len()));
        list.push(TestOutcome::new(test_id, verdict));
        true
    }

    /// Outcome owning the exact canonical test identifier
    pub fn owner_mut(&mut self, test_id: &str) -> Option<&mut TestOutcome> {
        let &(verdict, idx) = self.owners.get(test_id)?;
        match verdict {
            Verdict::Fail => self.failed.get_mut(idx),
            Verdict::Pass => self.passed.get_mut(idx),
        }
    }

    pub fn failed(&self) -> &[TestOutcome] {
        &self.failed
    }

    pub fn passed(&self) -> &[TestOutcome] {
        &self.passed
    }

    /// Failing outcomes followed by passing outcomes
    pub fn iter(&self) -> impl Iterator<Item = &TestOutcome> {
        self.failed.iter().chain(self.passed.iter())
    }

    pub fn len(&self) -> usize {
        self.failed.len() + self.passed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
