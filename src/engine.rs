//! Fault localization engine
//!
//! Runs outcome correlation, aggregation, scoring and ranking once and
//! returns the ranked report. Every table is rebuilt per call.

use crate::aggregator;
use crate::coverage_store::{CoverageData, CoverageStore};
use crate::formulas::Metric;
use crate::outcomes::OutcomeIndex;
use crate::ranking::{self, RankedFile};
use crate::selection::{self, Selection};
use anyhow::{Context, Result};
use std::path::Path;

/// Ranked result of one localization run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SbflReport {
    pub total_failed_executions: u64,
    pub total_passed_executions: u64,
    pub files: Vec<RankedFile>,
}

impl SbflReport {
    /// Keep only the records chosen by `selection` under `metrics`
    pub fn select(&self, selection: Selection, metrics: &[Metric]) -> Self {
        Self {
            total_failed_executions: self.total_failed_executions,
            total_passed_executions: self.total_passed_executions,
            files: selection::select(&self.files, selection, metrics),
        }
    }

    /// Number of records across all files
    pub fn record_count(&self) -> usize {
        self.files.iter().map(|f| f.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Aggregate, score and rank
pub fn localize<S: CoverageStore + ?Sized>(store: &S, outcomes: &mut OutcomeIndex) -> SbflReport {
    let table = aggregator::aggregate(store, outcomes);
    let files = ranking::rank_table(&table);
    tracing::debug!(
        "Ranked {} lines across {} files",
        table.line_count(),
        files.len()
    );

    SbflReport {
        total_failed_executions: table.total_failed_executions,
        total_passed_executions: table.total_passed_executions,
        files,
    }
}

/// Load both artifacts from disk and localize
///
/// Fails before any ranking if either artifact cannot be opened.
pub fn localize_files(coverage: &Path, outcomes: &Path) -> Result<SbflReport> {
    let store = CoverageData::from_json_file(coverage)
        .with_context(|| format!("Failed to open coverage data {}", coverage.display()))?;
    let mut index = OutcomeIndex::from_json_file(outcomes)
        .with_context(|| format!("Failed to open test report {}", outcomes.display()))?;

    Ok(localize(&store, &mut index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CoverageData {
        let mut data = CoverageData::new();
        for line in 1..=6 {
            data.add_line("pkg/mod.py", line);
        }
        data.add_context("pkg/mod.py", 1, "tests/test_mod.py::test_a|run");
        data.add_context("pkg/mod.py", 1, "tests/test_mod.py::test_b|run");
        data.add_context("pkg/mod.py", 1, "tests/test_mod.py::test_c|run");
        data.add_context("pkg/mod.py", 2, "tests/test_mod.py::test_a|run");
        data.add_context("pkg/mod.py", 3, "tests/test_mod.py::test_b|run");
        data.add_context("pkg/mod.py", 4, "tests/test_mod.py::test_c|run");
        data
    }

    #[test]
    fn test_localize_ranks_failing_only_line_first() {
        let mut outcomes = OutcomeIndex::from_ids(
            ["tests/test_mod.py::test_a"],
            ["tests/test_mod.py::test_b", "tests/test_mod.py::test_c"],
        );
        let report = localize(&store(), &mut outcomes);

        assert_eq!(report.total_failed_executions, 2);
        assert_eq!(report.total_passed_executions, 4);
        assert_eq!(report.files.len(), 1);

        let top = report.files[0]
            .records
            .iter()
            .find(|r| r.rank(Metric::Ochiai) == 1)
            .unwrap();
        assert_eq!(top.line_number, 2);
        assert_eq!(report.files[0].total_lines, 6);
    }

    #[test]
    fn test_localize_without_failures_scores_zero() {
        let mut outcomes = OutcomeIndex::from_ids(
            Vec::<String>::new(),
            ["tests/test_mod.py::test_b", "tests/test_mod.py::test_c"],
        );
        let report = localize(&store(), &mut outcomes);
        assert_eq!(report.total_failed_executions, 0);
        for record in &report.files[0].records {
            assert_eq!(record.score(Metric::Tarantula), 0.0);
            assert_eq!(record.score(Metric::Ochiai), 0.0);
            assert_eq!(record.score(Metric::DStar), 0.0);
        }
    }

    #[test]
    fn test_select_preserves_totals() {
        let mut outcomes = OutcomeIndex::from_ids(
            ["tests/test_mod.py::test_a"],
            ["tests/test_mod.py::test_b"],
        );
        let report = localize(&store(), &mut outcomes);
        let selected = report.select(Selection::Top, &Metric::ALL);
        assert_eq!(
            selected.total_failed_executions,
            report.total_failed_executions
        );
        assert!(selected.record_count() <= report.record_count());
    }

    #[test]
    fn test_localize_files_missing_coverage_is_fatal() {
        let result = localize_files(
            Path::new("/nonexistent/coverage.json"),
            Path::new("/nonexistent/report.json"),
        );
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("coverage data"));
    }
}
