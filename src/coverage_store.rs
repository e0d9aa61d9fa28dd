//! Coverage store reader
//!
//! Supplies, per measured source file, the instrumented lines and the
//! execution contexts that touched each line. The on-disk format is the
//! coverage.py JSON export produced by `coverage json --show-contexts`:
//!
//! ```json
//! {
//!   "meta": { "version": "7.4.0", "show_contexts": true },
//!   "files": {
//!     "src/mod.py": {
//!       "executed_lines": [1, 2, 4],
//!       "missing_lines": [3],
//!       "contexts": { "1": [""], "2": ["tests/test_mod.py::test_add|run"] }
//!     }
//!   }
//! }
//! ```
//!
//! Context strings recorded by pytest-cov (`--cov-context=test`) carry a
//! phase suffix (`|setup`, `|run`, `|teardown`); [`canonical_test_id`]
//! strips it so contexts can be matched to test identifiers exactly.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while opening a coverage store
#[derive(Error, Debug)]
pub enum CoverageStoreError {
    #[error("Coverage data file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid coverage JSON: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for coverage store operations
pub type Result<T> = std::result::Result<T, CoverageStoreError>;

/// Phase suffixes pytest-cov appends to test contexts
const PHASE_SUFFIXES: [&str; 3] = ["|run", "|setup", "|teardown"];

/// Read-only query interface over recorded coverage
pub trait CoverageStore {
    /// Files that have coverage data, in store order
    fn measured_files(&self) -> Vec<&str>;

    /// Instrumented (executable) line numbers for a file
    fn lines_for(&self, file: &str) -> Option<&BTreeSet<u32>>;

    /// Mapping from raw line number to the contexts that executed it
    fn contexts_by_line(&self, file: &str) -> Option<&BTreeMap<i64, Vec<String>>>;
}

/// Coverage recorded for a single measured file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileCoverage {
    /// Executed plus missing lines
    pub lines: BTreeSet<u32>,
    /// Raw line number -> contexts
    pub contexts: BTreeMap<i64, Vec<String>>,
}

/// In-memory coverage data, loaded from a coverage.py JSON export or built
/// programmatically
#[derive(Debug, Clone, Default)]
pub struct CoverageData {
    files: BTreeMap<String, FileCoverage>,
}

#[derive(Debug, Deserialize)]
struct JsonReport {
    #[serde(default)]
    meta: Option<JsonMeta>,
    #[serde(default)]
    files: BTreeMap<String, JsonFile>,
}

#[derive(Debug, Deserialize)]
struct JsonMeta {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    show_contexts: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct JsonFile {
    #[serde(default)]
    executed_lines: Vec<u32>,
    #[serde(default)]
    missing_lines: Vec<u32>,
    #[serde(default)]
    contexts: Option<BTreeMap<String, Vec<String>>>,
}

impl CoverageData {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a coverage.py JSON export
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoverageStoreError::FileNotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(path)?;
        let data = Self::from_json_str(&contents)?;
        tracing::info!(
            "Loaded coverage for {} files from {}",
            data.files.len(),
            path.display()
        );
        Ok(data)
    }

    /// Parse a coverage.py JSON export
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let report: JsonReport = serde_json::from_str(contents)?;

        if let Some(meta) = &report.meta {
            if meta.show_contexts == Some(false) {
                tracing::warn!(
                    "Coverage data (coverage.py {}) was exported without --show-contexts; no line can be attributed to a test",
                    meta.version.as_deref().unwrap_or("unknown")
                );
            }
        }

        let mut data = Self::new();
        for (path, file) in report.files {
            let mut coverage = FileCoverage {
                lines: file
                    .executed_lines
                    .iter()
                    .chain(file.missing_lines.iter())
                    .copied()
                    .collect(),
                contexts: BTreeMap::new(),
            };

            for (key, contexts) in file.contexts.unwrap_or_default() {
                match key.trim().parse::<i64>() {
                    Ok(line) => {
                        coverage.contexts.insert(line, contexts);
                    }
                    Err(_) => {
                        tracing::warn!("Skipping unparseable line key {:?} in {}", key, path);
                    }
                }
            }

            data.files.insert(path, coverage);
        }

        Ok(data)
    }

    /// Declare an instrumented line without any context
    pub fn add_line(&mut self, file: &str, line: u32) {
        self.files
            .entry(file.to_string())
            .or_default()
            .lines
            .insert(line);
    }

    /// Record that `context` executed `line` of `file`
    ///
    /// The line is also registered as instrumented.
    pub fn add_context(&mut self, file: &str, line: i64, context: &str) {
        let coverage = self.files.entry(file.to_string()).or_default();
        if let Ok(abs_line) = u32::try_from(line.unsigned_abs()) {
            coverage.lines.insert(abs_line);
        }
        coverage
            .contexts
            .entry(line)
            .or_default()
            .push(context.to_string());
    }

    /// Number of measured files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when no file was measured
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl CoverageStore for CoverageData {
    fn measured_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    fn lines_for(&self, file: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(file).map(|f| &f.lines)
    }

    fn contexts_by_line(&self, file: &str) -> Option<&BTreeMap<i64, Vec<String>>> {
        self.files.get(file).map(|f| &f.contexts)
    }
}

/// Reduce a raw context string to the test identifier it belongs to
///
/// Returns `None` for the empty (default) context.
pub fn canonical_test_id(context: &str) -> Option<&str> {
    let context = context.trim();
    let id = PHASE_SUFFIXES
        .iter()
        .find_map(|suffix| context.strip_suffix(suffix))
        .unwrap_or(context);

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "meta": {"version": "7.4.0", "timestamp": "2024-01-01T00:00:00", "branch_coverage": false, "show_contexts": true},
        "files": {
            "src/calc.py": {
                "executed_lines": [1, 2, 4],
                "summary": {"covered_lines": 3, "num_statements": 4},
                "missing_lines": [3],
                "excluded_lines": [],
                "contexts": {
                    "1": [""],
                    "2": ["tests/test_calc.py::test_add|run", "tests/test_calc.py::test_sub|run"],
                    "4": ["tests/test_calc.py::test_sub|run"]
                }
            },
            "src/util.py": {
                "executed_lines": [],
                "missing_lines": [1, 2],
                "excluded_lines": []
            }
        },
        "totals": {"covered_lines": 3}
    }"#;

    #[test]
    fn test_from_json_str_parses_files() {
        let data = CoverageData::from_json_str(SAMPLE).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.measured_files(), vec!["src/calc.py", "src/util.py"]);
    }

    #[test]
    fn test_lines_for_includes_missing_lines() {
        let data = CoverageData::from_json_str(SAMPLE).unwrap();
        let lines = data.lines_for("src/calc.py").unwrap();
        assert_eq!(lines.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_contexts_by_line() {
        let data = CoverageData::from_json_str(SAMPLE).unwrap();
        let contexts = data.contexts_by_line("src/calc.py").unwrap();
        assert_eq!(contexts.len(), 3);
        assert_eq!(contexts[&2].len(), 2);
        assert!(data.contexts_by_line("src/util.py").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_file_returns_none() {
        let data = CoverageData::from_json_str(SAMPLE).unwrap();
        assert!(data.lines_for("missing.py").is_none());
        assert!(data.contexts_by_line("missing.py").is_none());
    }

    #[test]
    fn test_unparseable_line_key_is_skipped() {
        let json = r#"{"files": {"a.py": {"executed_lines": [1], "contexts": {"one": ["t|run"], "1": ["t|run"]}}}}"#;
        let data = CoverageData::from_json_str(json).unwrap();
        let contexts = data.contexts_by_line("a.py").unwrap();
        assert_eq!(contexts.len(), 1);
        assert!(contexts.contains_key(&1));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let result = CoverageData::from_json_str("not json");
        assert!(matches!(result, Err(CoverageStoreError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = CoverageData::from_json_file("/nonexistent/coverage.json");
        assert!(matches!(result, Err(CoverageStoreError::FileNotFound(_))));
    }

    #[test]
    fn test_add_context_registers_abs_line() {
        let mut data = CoverageData::new();
        data.add_context("a.py", -7, "t::x|run");
        assert!(data.lines_for("a.py").unwrap().contains(&7));
        assert!(data.contexts_by_line("a.py").unwrap().contains_key(&-7));
    }

    #[test]
    fn test_canonical_test_id_strips_phase() {
        assert_eq!(
            canonical_test_id("tests/test_a.py::test_x|run"),
            Some("tests/test_a.py::test_x")
        );
        assert_eq!(
            canonical_test_id("tests/test_a.py::test_x|setup"),
            Some("tests/test_a.py::test_x")
        );
        assert_eq!(
            canonical_test_id("tests/test_a.py::test_x"),
            Some("tests/test_a.py::test_x")
        );
    }

    #[test]
    fn test_canonical_test_id_empty_context() {
        assert_eq!(canonical_test_id(""), None);
        assert_eq!(canonical_test_id("|run"), None);
    }

    #[test]
    fn test_canonical_test_id_keeps_param_pipes() {
        assert_eq!(
            canonical_test_id("t.py::test_p[a|b]|run"),
            Some("t.py::test_p[a|b]")
        );
    }
}
